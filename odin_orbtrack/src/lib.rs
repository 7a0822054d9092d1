/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! position tracking for a catalog of earth orbiting objects: TLE ingestion, SGP4 propagation,
//! inertial/earth-fixed display frames, orbit path sampling, selection and owner filtering, driven
//! by a single periodic tick task

use std::f64::consts::PI as STD_PI;
use chrono::{DateTime,Utc};

pub mod errors;
pub mod cartesian3;
pub mod elements;
pub mod propagator;
pub mod frame;
pub mod sampler;
pub mod catalog;
pub mod selection;
pub mod config;
pub mod engine;
pub mod scheduler;
pub mod feed;

pub use errors::{OrbTrackError, Result};
pub use config::{load_config, OrbTrackConfig, StartupQuery};
pub use elements::{ElementSet, OrbitalRecord, RawElementRecord, parse_tle_text};
pub use propagator::{Propagator, Sgp4Propagator};
pub use frame::{FrameTransform, Geodetic, ReferenceFrame};
pub use sampler::{OrbitPath, OrbitSampler, SamplingPolicy};
pub use catalog::{Catalog, CatalogStore, OwnershipEntry, parse_ownership_json};
pub use selection::{OwnerFilterPolicy, SelectionChange, SelectionManager};
pub use engine::{EngineChange, OrbitEngine, TickUpdate};
pub use scheduler::{EngineHandle, EngineService, EngineUpdate};
pub use feed::{FeedSource, FileFeedSource, run_feed_cycle};

pub const PI: f64 = STD_PI;
pub const HALF_PI: f64 = PI / 2.0;
pub const TWO_PI: f64 = PI * 2.0;

#[inline]
pub fn utc_now ()->DateTime<Utc> {
    Utc::now()
}

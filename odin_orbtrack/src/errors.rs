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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrbTrackError>;

/// none of these is fatal for the engine - they are either recovered locally (dropped records,
/// retained positions, skipped feed cycles) or reported back to the caller of a single operation
#[derive(Error,Debug)]
pub enum OrbTrackError {

    #[error("element set error {0}")]
    ElementParse( String ),

    #[error("propagation diverged for satellite {sat_id}: {msg}")]
    PropagationDivergence { sat_id: u32, msg: String },

    #[error("feed unavailable {0}")]
    FeedUnavailable( String ),

    #[error("stale ownership merge for catalog generation {expected} (current {current})")]
    StaleMerge { expected: u64, current: u64 },

    #[error("invalid sampling policy {0}")]
    InvalidSampling( String ),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("config error {0}")]
    ConfigError( #[from] ron::error::SpannedError),

    #[error("JSON error {0}")]
    JsonError( #[from] serde_json::Error),

    #[error("engine service closed")]
    ServiceClosed,

    #[error("operation failed {0}")]
    OpFailedError(String),
}

impl OrbTrackError {
    /// divergences are expected per record/tick faults that only degrade data
    pub fn is_divergence (&self)->bool {
        matches!( self, OrbTrackError::PropagationDivergence{..})
    }
}

macro_rules! elements_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OrbTrackError::ElementParse( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use elements_error;

macro_rules! feed_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OrbTrackError::FeedUnavailable( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use feed_error;

macro_rules! op_failed {
    ($fmt:literal $(, $arg:expr )* ) => {
        OrbTrackError::OpFailedError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use op_failed;

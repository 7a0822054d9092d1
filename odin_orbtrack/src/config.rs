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

use std::{fs, path::{Path,PathBuf}, time::Duration};
use serde::{Serialize,Deserialize,de::DeserializeOwned};
use tracing::debug;
use crate::{
    errors::Result,
    frame::{ReferenceFrame, MEAN_EARTH_RADIUS},
    sampler::SamplingPolicy,
    selection::OwnerFilterPolicy
};

/// load a RON config file. Missing fields of configs that implement `Default` via `#[serde(default)]`
/// get the default values
pub fn load_config <C: DeserializeOwned> (path: impl AsRef<Path>)->Result<C> {
    let path = path.as_ref();
    debug!("loading config {:?}", path);
    let contents = fs::read_to_string(path)?;
    Ok( ron::from_str::<C>( contents.as_str())? )
}

#[derive(Debug,Clone,Serialize,Deserialize)]
#[serde(default)]
pub struct OrbTrackConfig {
    pub tick_interval: Duration,
    pub slider_range: Duration, // time override range starting at the service start time
    pub earth_radius: f64, // km
    pub sampling: SamplingPolicy,
    pub initial_frame: ReferenceFrame,
    pub owner_filter_policy: OwnerFilterPolicy,
    pub elements_file: Option<PathBuf>,
    pub ownership_file: Option<PathBuf>,
    pub startup_query: Option<String>, // e.g. "ss=25544,43013&highlight=noaa"
    pub update_queue_len: usize,
}

impl Default for OrbTrackConfig {
    fn default()->Self {
        OrbTrackConfig {
            tick_interval: Duration::from_secs(1),
            slider_range: Duration::from_secs(24*60*60),
            earth_radius: MEAN_EARTH_RADIUS,
            sampling: SamplingPolicy::default(),
            initial_frame: ReferenceFrame::Inertial,
            owner_filter_policy: OwnerFilterPolicy::Override,
            elements_file: None,
            ownership_file: None,
            startup_query: None,
            update_queue_len: 64,
        }
    }
}

/// selection bootstrap from a URL query string. Unknown keys and ids that are not numbers are ignored
#[derive(Debug,Clone,Default,PartialEq)]
pub struct StartupQuery {
    pub selected_ids: Vec<u32>,
    pub highlight: Option<String>,
}

impl StartupQuery {
    pub fn parse (query: &str)->Self {
        let query = query.trim().trim_start_matches('?');
        let mut sq = StartupQuery::default();

        for (k,v) in url::form_urlencoded::parse( query.as_bytes()) {
            match k.as_ref() {
                "ss" => {
                    sq.selected_ids.extend( v.split(',').filter_map(|s| s.trim().parse::<u32>().ok()));
                }
                "highlight" => {
                    let v = v.trim();
                    if !v.is_empty() { sq.highlight = Some(v.to_string()) }
                }
                _ => {}
            }
        }
        sq
    }

    pub fn is_empty (&self)->bool {
        self.selected_ids.is_empty() && self.highlight.is_none()
    }
}

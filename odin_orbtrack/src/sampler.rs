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

use std::fmt;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize,Deserialize};
use crate::{
    cartesian3::Cartesian3, elements::OrbitalRecord, frame::{FrameTransform, ReferenceFrame}, propagator::Propagator,
    errors::{OrbTrackError, Result}
};

/// upper bound for the number of points in a single orbit path (about 69 days at 1 min resolution)
pub const MAX_PATH_POINTS: usize = 100_000;

/// look-ahead window and granularity of orbit paths
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct SamplingPolicy {
    pub step_minutes: f64,
    pub total_minutes: f64,
}

impl Default for SamplingPolicy {
    /// one point per minute over about one LEO revolution
    fn default()->Self { SamplingPolicy { step_minutes: 1.0, total_minutes: 96.0 } }
}

impl SamplingPolicy {
    pub fn new (step_minutes: f64, total_minutes: f64)->Self {
        SamplingPolicy { step_minutes, total_minutes }
    }

    /// floor(total/step) + 1 (the start point is included), at most `MAX_PATH_POINTS`. The relative epsilon
    /// keeps representation errors such as 0.3/0.1 from dropping the last point
    pub fn n_points (&self)->Result<usize> {
        let SamplingPolicy { step_minutes, total_minutes } = *self;

        if !step_minutes.is_finite() || step_minutes <= 0.0 {
            return Err( OrbTrackError::InvalidSampling( format!("step must be positive, got {step_minutes}")))
        }
        if !total_minutes.is_finite() || total_minutes < 0.0 {
            return Err( OrbTrackError::InvalidSampling( format!("window must not be negative, got {total_minutes}")))
        }

        let n_steps = ((total_minutes / step_minutes) * (1.0 + 1e-12)).floor();
        if n_steps >= MAX_PATH_POINTS as f64 {
            return Err( OrbTrackError::InvalidSampling(
                format!("{total_minutes} min window with {step_minutes} min steps exceeds {MAX_PATH_POINTS} points")))
        }

        Ok( n_steps as usize + 1 )
    }

    pub fn time_of (&self, start: DateTime<Utc>, i: usize)->DateTime<Utc> {
        start + TimeDelta::milliseconds( (i as f64 * self.step_minutes * 60_000.0).round() as i64)
    }
}

/// renderable polyline for one record, only valid for the frame it was sampled in
#[derive(Debug,Clone,PartialEq)]
pub struct OrbitPath {
    pub sat_id: u32,
    pub frame: ReferenceFrame,
    pub start: DateTime<Utc>,
    pub policy: SamplingPolicy,
    pub points: Vec<Cartesian3>,
    pub n_held: usize, // number of points that replicate a neighbor because propagation diverged
}

impl OrbitPath {
    pub fn len (&self)->usize { self.points.len() }
    pub fn is_empty (&self)->bool { self.points.is_empty() }

    pub fn is_valid_for (&self, frame: ReferenceFrame)->bool {
        self.frame == frame
    }
}

impl fmt::Display for OrbitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrbitPath( sat_id:{}, frame:{}, start:{}, step:{} min, n_points:{}, held:{})",
            self.sat_id, self.frame, self.start, self.policy.step_minutes, self.points.len(), self.n_held)
    }
}

/// computes orbit paths. This does not keep any state between calls - the same input always
/// produces the same path
pub struct OrbitSampler<'a> {
    propagator: &'a dyn Propagator,
    transform: &'a FrameTransform,
}

impl<'a> OrbitSampler<'a> {
    pub fn new (propagator: &'a dyn Propagator, transform: &'a FrameTransform)->Self {
        OrbitSampler { propagator, transform }
    }

    /// a diverging sample point holds its predecessor's value (leading ones are back-filled with the first
    /// valid point) so that the path always has `policy.n_points()` points. Only if no point at all
    /// could be computed we return a divergence error
    pub fn sample_path (&self, record: &OrbitalRecord, frame: ReferenceFrame, start: DateTime<Utc>, policy: SamplingPolicy)->Result<OrbitPath> {
        let n = policy.n_points()?;
        let elements = record.elements();

        let mut points: Vec<Cartesian3> = Vec::with_capacity(n);
        let mut n_leading = 0;
        let mut n_held = 0;

        for i in 0..n {
            let t = policy.time_of( start, i);

            match self.propagator.propagate( elements, t) {
                Ok(p) => {
                    let rp = self.transform.to_renderable( &p, self.propagator.sidereal_angle(t), frame);
                    if points.is_empty() {
                        points.resize( n_leading, rp);
                    }
                    points.push( rp);
                }
                Err(e) if e.is_divergence() => {
                    n_held += 1;
                    match points.last() {
                        Some(last) => { let last = *last; points.push( last) }
                        None => n_leading += 1
                    }
                }
                Err(e) => return Err(e)
            }
        }

        if points.is_empty() {
            return Err( OrbTrackError::PropagationDivergence{ sat_id: record.id(), msg: format!("no valid point in {n} samples") })
        }
        if n_held > 0 {
            tracing::debug!("orbit path of {} has {} held points", record.id(), n_held);
        }

        Ok( OrbitPath { sat_id: record.id(), frame, start, policy, points, n_held } )
    }
}

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

use std::sync::LazyLock;
use chrono::{DateTime, TimeZone, Utc};
use crate::{cartesian3::Cartesian3, elements::ElementSet, errors::{OrbTrackError, Result}, TWO_PI};

/// J2000 reference epoch (2000-01-01T12:00:00Z)
static J2000: LazyLock<DateTime<Utc>> = LazyLock::new(|| Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap());

const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;

/// anything below the polar radius (km) is considered decayed
pub const MIN_ORBIT_RADIUS: f64 = 6356.75;

/// the adapter around the external propagation capability. Implementations have to be pure functions
/// of their inputs so that we can call them for different records in any order (or concurrently)
pub trait Propagator: Send + Sync {

    /// position in an Earth-centered inertial frame (TEME), in km. There is no validity window - any
    /// time before or after the element set epoch is accepted. Numerical failures are reported as
    /// `OrbTrackError::PropagationDivergence`
    fn propagate (&self, elements: &ElementSet, t: DateTime<Utc>) -> Result<Cartesian3>;

    /// rotation angle of the earth (radians) at time t
    fn sidereal_angle (&self, t: DateTime<Utc>) -> f64 {
        gmst(t)
    }
}

/// the production propagator that uses the sgp4 crate (SGP4/SDP4 per element set type)
#[derive(Debug,Clone,Copy,Default)]
pub struct Sgp4Propagator;

impl Propagator for Sgp4Propagator {
    fn propagate (&self, elements: &ElementSet, t: DateTime<Utc>) -> Result<Cartesian3> {
        let sat_id = elements.sat_id();
        let minutes = elements.minutes_since_epoch(t);

        let prediction = elements.constants().propagate( sgp4::MinutesSinceEpoch(minutes))
            .map_err(|e| OrbTrackError::PropagationDivergence{ sat_id, msg: e.to_string() })?;

        let p = Cartesian3::from_array( prediction.position);
        if !p.is_finite() {
            Err( OrbTrackError::PropagationDivergence{ sat_id, msg: "non-finite position".to_string() })
        } else if p.length() < MIN_ORBIT_RADIUS {
            Err( OrbTrackError::PropagationDivergence{ sat_id, msg: format!("decayed (r = {:.1} km)", p.length()) })
        } else {
            Ok(p)
        }
    }
}

/// Greenwich mean sidereal time in radians [0..2π) (IAU 1982 polynomial, UT1 approximated by UTC)
pub fn gmst (t: DateTime<Utc>) -> f64 {
    let d = (t - *J2000).num_milliseconds() as f64 / 86_400_000.0;
    let c = d / DAYS_PER_JULIAN_CENTURY;

    let deg = 280.46061837 + 360.98564736629 * d + 0.000387933 * c * c - c * c * c / 38710000.0;
    deg.to_radians().rem_euclid(TWO_PI)
}

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

//! conversion of inertial (TEME) positions into renderable scene coordinates.
//!
//! The scene basis is y-up: scene `(x,y,z)` corresponds to frame `(x,z,-y)`. In the inertial frame this
//! is the only transformation. In the earth-fixed frame we first rotate by the sidereal angle, then go
//! through spherical geodetic coordinates (radius R) and map back with
//! ```text
//!   x = -(R+alt)·sin(φ)·cos(θ),  y = (R+alt)·cos(φ),  z = (R+alt)·sin(φ)·sin(θ)
//!   φ = 90° - lat (colatitude), θ = lon + 180°
//! ```

use std::fmt;
use chrono::{DateTime,Utc};
use nalgebra::{Rotation3, Vector3};
use serde::{Serialize,Deserialize};
use crate::{cartesian3::Cartesian3, HALF_PI, PI};

/// mean earth radius in km, the sphere we use for geodetic conversion
pub const MEAN_EARTH_RADIUS: f64 = 6371.0;

/// the two mutually exclusive display frames
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize,Default)]
pub enum ReferenceFrame {
    /// fixed stars, orbit paths are static in space
    #[default]
    Inertial,
    /// rotates with the earth, orbit paths sweep over the surface
    EarthFixed,
}

impl ReferenceFrame {
    pub fn toggled (&self)->ReferenceFrame {
        match self {
            ReferenceFrame::Inertial => ReferenceFrame::EarthFixed,
            ReferenceFrame::EarthFixed => ReferenceFrame::Inertial,
        }
    }
}

impl fmt::Display for ReferenceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceFrame::Inertial => write!(f, "inertial"),
            ReferenceFrame::EarthFixed => write!(f, "earth-fixed"),
        }
    }
}

/// spherical geodetic coordinates
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct Geodetic {
    pub latitude: f64,  // radians
    pub longitude: f64, // radians [-π..π)
    pub altitude: f64,  // km above sphere
}

impl Geodetic {
    pub fn from_degrees (lat_deg: f64, lon_deg: f64, altitude: f64)->Self {
        Geodetic { latitude: lat_deg.to_radians(), longitude: lon_deg.to_radians(), altitude }
    }

    pub fn latitude_deg (&self)->f64 { self.latitude.to_degrees() }
    pub fn longitude_deg (&self)->f64 { self.longitude.to_degrees() }
}

impl fmt::Display for Geodetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ lat: {:.4}°, lon: {:.4}°, alt: {:.1} km }}", self.latitude_deg(), self.longitude_deg(), self.altitude)
    }
}

/// stateless apart from the sphere radius - the active frame is owned by the engine and passed in,
/// which means switching frames never touches this object or any record
#[derive(Debug,Clone,Copy)]
pub struct FrameTransform {
    earth_radius: f64,
}

impl Default for FrameTransform {
    fn default()->Self { FrameTransform { earth_radius: MEAN_EARTH_RADIUS } }
}

impl FrameTransform {
    pub fn new (earth_radius: f64)->Self {
        FrameTransform { earth_radius }
    }

    pub fn earth_radius (&self)->f64 { self.earth_radius }

    /// the main conversion. `sidereal_angle` is the earth rotation angle at the time of `p` (see
    /// `Propagator::sidereal_angle`), it is ignored for the inertial frame. We take the angle instead of
    /// the timestamp so that the earth rotation model stays with the propagator and a tick computes it
    /// once for all records
    pub fn to_renderable (&self, p: &Cartesian3, sidereal_angle: f64, frame: ReferenceFrame)->Cartesian3 {
        match frame {
            ReferenceFrame::Inertial => to_scene_basis(p),
            ReferenceFrame::EarthFixed => {
                let ecef = inertial_to_earth_fixed( p, sidereal_angle);
                self.geodetic_to_scene( &self.earth_fixed_to_geodetic( &ecef))
            }
        }
    }

    pub fn inertial_to_geodetic (&self, p: &Cartesian3, sidereal_angle: f64)->Geodetic {
        self.earth_fixed_to_geodetic( &inertial_to_earth_fixed( p, sidereal_angle))
    }

    pub fn earth_fixed_to_geodetic (&self, p: &Cartesian3)->Geodetic {
        let r = p.length();
        if r == 0.0 {
            return Geodetic { latitude: 0.0, longitude: 0.0, altitude: -self.earth_radius }
        }

        let latitude = (p.z / r).clamp(-1.0, 1.0).asin();
        let longitude = p.y.atan2(p.x);
        Geodetic { latitude, longitude, altitude: r - self.earth_radius }
    }

    /// well defined at the poles (sin(φ) = 0 collapses x and z)
    pub fn geodetic_to_scene (&self, g: &Geodetic)->Cartesian3 {
        let r = self.earth_radius + g.altitude;
        let phi = HALF_PI - g.latitude;
        let theta = g.longitude + PI;

        Cartesian3::new(
            -r * phi.sin() * theta.cos(),
             r * phi.cos(),
             r * phi.sin() * theta.sin()
        )
    }

    /// inverse of `geodetic_to_scene`, used for ground track readouts of earth-fixed scene points
    pub fn scene_to_geodetic (&self, p: &Cartesian3)->Geodetic {
        let r = p.length();
        if r == 0.0 {
            return Geodetic { latitude: 0.0, longitude: 0.0, altitude: -self.earth_radius }
        }

        let phi = (p.y / r).clamp(-1.0, 1.0).acos();
        let theta = p.z.atan2( -p.x);

        Geodetic { latitude: HALF_PI - phi, longitude: normalize_pi(theta - PI), altitude: r - self.earth_radius }
    }
}

/// rotate inertial position about the z-axis by the negative sidereal angle
pub fn inertial_to_earth_fixed (p: &Cartesian3, sidereal_angle: f64)->Cartesian3 {
    let rot = Rotation3::from_axis_angle( &Vector3::z_axis(), -sidereal_angle);
    Cartesian3::from( rot * Vector3::from(p))
}

/// fixed axis permutation into the y-up scene basis
pub fn to_scene_basis (p: &Cartesian3)->Cartesian3 {
    Cartesian3::new( p.x, p.z, -p.y)
}

/// normalize angle to [-π..π)
pub fn normalize_pi (a: f64)->f64 {
    (a + PI).rem_euclid( 2.0 * PI) - PI
}

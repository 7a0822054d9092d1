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

use std::ops::{Add, Mul, Sub};
use nalgebra::Vector3;
use serde::{Serialize,Deserialize};

/// plain 3d vector without frame semantics. All orbital positions in this crate are in kilometers,
/// the frame (TEME, ECEF or scene) is determined by the context the value is used in
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct Cartesian3 {
    pub x: f64,
    pub y: f64,
    pub z: f64
}

impl Cartesian3 {
    pub fn new (x: f64, y: f64, z: f64)->Cartesian3 {
        Cartesian3{x,y,z}
    }

    pub fn zero ()->Cartesian3 {
        Cartesian3{x: 0.0, y: 0.0, z: 0.0}
    }

    pub fn from_array (a: [f64;3])->Cartesian3 {
        Cartesian3{ x: a[0], y: a[1], z: a[2] }
    }

    pub fn dot (&self, p: &Cartesian3) -> f64 {
        (self.x * p.x) + (self.y * p.y) + (self.z * p.z)
    }

    pub fn length (&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_finite (&self)->bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// component-wise comparison with absolute tolerance
    pub fn approx_eq (&self, p: &Cartesian3, eps: f64)->bool {
        (self.x - p.x).abs() <= eps && (self.y - p.y).abs() <= eps && (self.z - p.z).abs() <= eps
    }
}

impl std::fmt::Display for Cartesian3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[ {:.3}, {:.3}, {:.3} ]", self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for Cartesian3 {
    fn from (v: Vector3<f64>)->Self {
        Cartesian3::new( v.x, v.y, v.z)
    }
}

impl From<&Cartesian3> for Vector3<f64> {
    fn from (p: &Cartesian3)->Self {
        Vector3::new( p.x, p.y, p.z)
    }
}

impl Add for Cartesian3 {
    type Output = Self;

    fn add (self, rhs: Self) -> Self {
        Cartesian3::new( self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Cartesian3 {
    type Output = Self;

    fn sub (self, rhs: Self) -> Self {
        Cartesian3::new( self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Cartesian3 {
    type Output = Self;

    fn mul (self, rhs: f64) -> Self {
        Cartesian3::new( self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

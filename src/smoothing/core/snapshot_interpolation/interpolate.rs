use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Blends two payload values at ratio `t` in [0, 1].
pub trait Interpolate: Clone {
    fn interpolate(&self, to: &Self, t: f64) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        self + (to - self) * t as f32
    }
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Interpolate for Vector2<f32> {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        self.lerp(to, t as f32)
    }
}

impl Interpolate for Vector3<f32> {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        self.lerp(to, t as f32)
    }
}

impl Interpolate for UnitQuaternion<f32> {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        self.slerp(to, t as f32)
    }
}

/// Planar rotation in radians, blended along the shortest arc.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Angle2D(pub f32);

impl Angle2D {
    pub fn radians(&self) -> f32 {
        self.0
    }

    // wrap into (-PI, PI]
    fn wrap(angle: f32) -> f32 {
        let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
        if wrapped <= -PI {
            wrapped + 2.0 * PI
        } else {
            wrapped
        }
    }
}

impl Interpolate for Angle2D {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        let delta = Self::wrap(to.0 - self.0);
        Angle2D(self.0 + delta * t as f32)
    }
}

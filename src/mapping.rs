use std::f64::consts::{FRAC_PI_2, TAU};

use crate::theory::{Flavor, FreeChord};

pub const DEFAULT_DEADZONE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiatonicSelection {
    pub degree: usize,
    pub flavor: Flavor,
}

/// Angle of `(x, y)` in `[0, 2π)`, zero at stick-up, clockwise.
pub fn angle_of(x: f64, y: f64) -> f64 {
    let mut angle = (-y).atan2(-x) - FRAC_PI_2;
    if angle < 0.0 {
        angle += TAU;
    }
    // a tiny negative angle can round up to exactly 2π
    if angle >= TAU {
        angle -= TAU;
    }
    angle
}

pub fn magnitude_of(x: f64, y: f64) -> f64 {
    x.hypot(y)
}

/// Whether a vector is far enough from centre to select a chord. A vector
/// exactly on the deadzone radius is not.
pub fn outside_deadzone(x: f64, y: f64, deadzone: f64) -> bool {
    magnitude_of(x, y) > deadzone
}

pub fn degree_for_angle(angle: f64, scale_len: usize) -> usize {
    ((angle / TAU * scale_len as f64).floor() as usize) % scale_len
}

pub fn flavor_for_magnitude(magnitude: f64) -> Flavor {
    let count = Flavor::ALL.len();
    let index = ((magnitude * count as f64).floor() as usize).min(count - 1);
    Flavor::ALL[index]
}

pub fn map_diatonic(x: f64, y: f64, scale_len: usize) -> DiatonicSelection {
    DiatonicSelection {
        degree: degree_for_angle(angle_of(x, y), scale_len),
        flavor: flavor_for_magnitude(magnitude_of(x, y)),
    }
}

pub fn free_chord_for_angle(angle: f64) -> FreeChord {
    let sectors = FreeChord::WHEEL_ORDER.len();
    let sector = TAU / sectors as f64;
    FreeChord::WHEEL_ORDER[((angle / sector).floor() as usize) % sectors]
}

pub fn map_free(x: f64, y: f64) -> FreeChord {
    free_chord_for_angle(angle_of(x, y))
}

//! Time of day and the global outdoor light multiplier.
//!
//! Block outdoor light is stored as a fixed 0-15 level. The renderer scales
//! it by [`SkyState::outdoor_light_factor`] so day and night need no relight.

use std::f32::consts::TAU;

use glam::Vec3;

const DAY_SKY: Vec3 = Vec3::new(0.53, 0.72, 0.95);
const NIGHT_SKY: Vec3 = Vec3::new(0.02, 0.03, 0.08);
/// Outdoor light never drops fully to black.
const MIN_OUTDOOR_FACTOR: f32 = 0.05;

/// Day/night cycle state.
#[derive(Clone, Debug, PartialEq)]
pub struct SkyState {
    /// Fraction of the day elapsed, in `[0, 1)`. 0 is midnight, 0.5 is noon.
    time_of_day: f32,
    day_length_seconds: f32,
}

impl SkyState {
    /// Starts at morning.
    pub fn new(day_length_seconds: f32) -> Self {
        Self {
            time_of_day: 0.3,
            day_length_seconds: day_length_seconds.max(f32::EPSILON),
        }
    }

    /// Fraction of the day elapsed, in `[0, 1)`.
    pub fn time_of_day(&self) -> f32 {
        self.time_of_day
    }

    /// Jumps to a time of day, wrapped into `[0, 1)`.
    pub fn set_time_of_day(&mut self, t: f32) {
        self.time_of_day = t.rem_euclid(1.0);
    }

    /// Advances the clock by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.set_time_of_day(self.time_of_day + dt / self.day_length_seconds);
    }

    /// Unit vector toward the sun. The sun rises in the east (+x) and is
    /// overhead (+z) at noon.
    pub fn sun_direction(&self) -> Vec3 {
        let angle = (self.time_of_day - 0.25) * TAU;
        Vec3::new(angle.cos(), 0.0, angle.sin()).normalize()
    }

    /// Multiplier applied to outdoor block light, in `[0.05, 1]`.
    pub fn outdoor_light_factor(&self) -> f32 {
        (self.sun_direction().z * 2.0 + 0.5).clamp(MIN_OUTDOOR_FACTOR, 1.0)
    }

    /// Sky clear colour for the current time.
    pub fn sky_color(&self) -> Vec3 {
        let t = (self.outdoor_light_factor() - MIN_OUTDOOR_FACTOR) / (1.0 - MIN_OUTDOOR_FACTOR);
        NIGHT_SKY.lerp(DAY_SKY, t)
    }
}

impl Default for SkyState {
    fn default() -> Self {
        Self::new(600.0)
    }
}

//! Two-channel block light propagation, cross-thread relight staging and the day/night sky.

pub mod engine;
pub mod sky;
pub mod staging;

pub use engine::{LightingEngine, LightingReport, ideal_light};
pub use sky::SkyState;
pub use staging::LightStaging;

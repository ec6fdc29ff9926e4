pub mod app;
pub mod avatar;
pub mod campus;
pub mod cli;
pub mod config;
pub mod events;
pub mod input;
pub mod picking;
pub mod resilience;
pub mod scene;
pub mod selection;
pub mod services;
pub mod view;

pub use app::{load_config, run_walkthrough, run_windowed, CampusApp, FrameReport, RenderSettings};

/// Wraps an angle into `[-PI, PI)`. Non-finite input has no meaningful wrap and yields `None`.
pub(crate) fn wrap_angle(radians: f32) -> Option<f32> {
    use std::f32::consts::{PI, TAU};
    radians.is_finite().then(|| (radians + PI).rem_euclid(TAU) - PI)
}

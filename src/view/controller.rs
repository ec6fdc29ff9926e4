use super::camera::{Camera3D, CameraPreset, FirstPersonRig, OrbitCamera};
use super::movement::MovementController;
use crate::config::AppConfig;
use crate::scene::TimeOfDay;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use winit::window::{CursorGrabMode, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Orbital,
    #[serde(alias = "first-person")]
    FirstPerson,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Orbital => ViewMode::FirstPerson,
            ViewMode::FirstPerson => ViewMode::Orbital,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Orbital => "orbital",
            ViewMode::FirstPerson => "first-person",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Session-scoped viewer settings. Changed only by explicit user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub view_mode: ViewMode,
    pub time_of_day: TimeOfDay,
    pub show_labels: bool,
    pub low_graphics: bool,
}

/// Something that can lock the pointer to the viewport.
pub trait PointerCapture {
    fn grab(&mut self) -> bool;
    fn release(&mut self);
    fn is_captured(&self) -> bool;
}

/// Capture stand-in for headless runs; only tracks the flag.
#[derive(Debug, Default)]
pub struct NoCapture {
    captured: bool,
    releases: u32,
}

impl NoCapture {
    pub fn releases(&self) -> u32 {
        self.releases
    }
}

impl PointerCapture for NoCapture {
    fn grab(&mut self) -> bool {
        self.captured = true;
        true
    }

    fn release(&mut self) {
        if self.captured {
            self.releases += 1;
        }
        self.captured = false;
    }

    fn is_captured(&self) -> bool {
        self.captured
    }
}

/// Cursor lock on a winit window. Falls back to confinement where locking is unsupported.
pub struct WindowCapture {
    window: Arc<Window>,
    captured: bool,
}

impl WindowCapture {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window, captured: false }
    }
}

impl PointerCapture for WindowCapture {
    fn grab(&mut self) -> bool {
        let grabbed = self
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => {
                self.window.set_cursor_visible(false);
                self.captured = true;
            }
            Err(err) => warn!(error = %err, "pointer capture unavailable"),
        }
        self.captured
    }

    fn release(&mut self) {
        if let Err(err) = self.window.set_cursor_grab(CursorGrabMode::None) {
            warn!(error = %err, "failed to release pointer capture");
        }
        self.window.set_cursor_visible(true);
        self.captured = false;
    }

    fn is_captured(&self) -> bool {
        self.captured
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSwitch {
    pub from: ViewMode,
    pub to: ViewMode,
    pub released_capture: bool,
}

/// Owns the view state and both camera rigs. Exactly one rig drives the camera at a time.
pub struct ViewController {
    state: ViewState,
    orbit: OrbitCamera,
    first_person: FirstPersonRig,
}

impl ViewController {
    pub fn new(config: &AppConfig) -> Self {
        let session = &config.session;
        Self {
            state: ViewState {
                view_mode: session.view_mode,
                time_of_day: session.time_of_day,
                show_labels: session.show_labels,
                low_graphics: session.low_graphics,
            },
            orbit: OrbitCamera::from_config(&config.orbital),
            first_person: FirstPersonRig::from_config(&config.first_person),
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn mode(&self) -> ViewMode {
        self.state.view_mode
    }

    pub fn is_first_person(&self) -> bool {
        self.state.view_mode == ViewMode::FirstPerson
    }

    pub fn orbit(&self) -> &OrbitCamera {
        &self.orbit
    }

    pub fn first_person(&self) -> &FirstPersonRig {
        &self.first_person
    }

    /// Switches rigs in one step. Movement is reset to the spawn pose on every change and any
    /// pointer capture is released when leaving first-person.
    pub fn set_mode(
        &mut self,
        mode: ViewMode,
        movement: &mut MovementController,
        capture: &mut dyn PointerCapture,
    ) -> Option<ModeSwitch> {
        let from = self.state.view_mode;
        if from == mode {
            return None;
        }
        let released_capture = from == ViewMode::FirstPerson && capture.is_captured();
        if from == ViewMode::FirstPerson {
            capture.release();
        }
        movement.reset();
        self.first_person.reset();
        self.state.view_mode = mode;
        info!(from = %from, to = %mode, "view mode changed");
        Some(ModeSwitch { from, to: mode, released_capture })
    }

    pub fn toggle_mode(
        &mut self,
        movement: &mut MovementController,
        capture: &mut dyn PointerCapture,
    ) -> Option<ModeSwitch> {
        self.set_mode(self.state.view_mode.toggled(), movement, capture)
    }

    pub fn set_time_of_day(&mut self, time_of_day: TimeOfDay) -> bool {
        if self.state.time_of_day == time_of_day {
            return false;
        }
        self.state.time_of_day = time_of_day;
        info!(time_of_day = %time_of_day, "time of day changed");
        true
    }

    pub fn set_show_labels(&mut self, show: bool) {
        self.state.show_labels = show;
    }

    pub fn set_low_graphics(&mut self, enabled: bool) -> bool {
        if self.state.low_graphics == enabled {
            return false;
        }
        self.state.low_graphics = enabled;
        info!(enabled, "low graphics mode changed");
        true
    }

    /// Only meaningful in orbital mode; ignored otherwise.
    pub fn apply_preset(&mut self, preset: CameraPreset) -> bool {
        if self.is_first_person() {
            return false;
        }
        self.orbit.apply_preset(preset);
        info!(preset = %preset, "camera preset applied");
        true
    }

    /// Pointer drag in orbital mode, mouse look in first-person.
    pub fn pointer_motion(&mut self, delta: Vec2, movement: &mut MovementController) {
        match self.state.view_mode {
            ViewMode::Orbital => self.orbit.drag(delta),
            ViewMode::FirstPerson => self.first_person.look(movement.pose_mut(), delta),
        }
    }

    pub fn zoom(&mut self, factor: f32) {
        if self.state.view_mode == ViewMode::Orbital {
            self.orbit.zoom(factor);
        }
    }

    pub fn update(&mut self) {
        if self.state.view_mode == ViewMode::Orbital {
            self.orbit.update();
        }
    }

    pub fn camera(&self, movement: &MovementController) -> Camera3D {
        match self.state.view_mode {
            ViewMode::Orbital => self.orbit.to_camera(),
            ViewMode::FirstPerson => self.first_person.to_camera(&movement.pose()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::movement::{MoveDirection, MovementState};

    fn setup() -> (ViewController, MovementController, NoCapture) {
        let config = AppConfig::default();
        (
            ViewController::new(&config),
            MovementController::new(&config.movement, &config.first_person),
            NoCapture::default(),
        )
    }

    #[test]
    fn round_trip_resets_movement_and_pose() {
        let (mut view, mut movement, mut capture) = setup();
        view.set_mode(ViewMode::FirstPerson, &mut movement, &mut capture).expect("switch");
        movement.set_key(MoveDirection::Forward, true);
        movement.set_key(MoveDirection::Left, true);
        for _ in 0..30 {
            movement.step(1.0 / 60.0);
        }
        assert_ne!(movement.pose(), movement.spawn());
        view.set_mode(ViewMode::Orbital, &mut movement, &mut capture).expect("switch back");
        assert_eq!(movement.state(), MovementState::default());
        assert_eq!(movement.pose(), movement.spawn());
    }

    #[test]
    fn leaving_first_person_releases_capture() {
        let (mut view, mut movement, mut capture) = setup();
        view.set_mode(ViewMode::FirstPerson, &mut movement, &mut capture);
        assert!(capture.grab());
        let switch = view.toggle_mode(&mut movement, &mut capture).expect("switch");
        assert!(switch.released_capture);
        assert!(!capture.is_captured());
        assert_eq!(capture.releases(), 1);
    }

    #[test]
    fn same_mode_is_not_a_transition() {
        let (mut view, mut movement, mut capture) = setup();
        assert!(view.set_mode(ViewMode::Orbital, &mut movement, &mut capture).is_none());
    }

    #[test]
    fn presets_are_ignored_in_first_person() {
        let (mut view, mut movement, mut capture) = setup();
        assert!(view.apply_preset(CameraPreset::BirdsEye));
        view.set_mode(ViewMode::FirstPerson, &mut movement, &mut capture);
        assert!(!view.apply_preset(CameraPreset::Overview));
    }

    #[test]
    fn camera_follows_active_rig() {
        let (mut view, mut movement, mut capture) = setup();
        assert!((view.camera(&movement).fov_y_radians - 60f32.to_radians()).abs() < 1e-6);
        view.set_mode(ViewMode::FirstPerson, &mut movement, &mut capture);
        let camera = view.camera(&movement);
        assert!((camera.fov_y_radians - 75f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.position.y, 1.7);
    }

    #[test]
    fn view_mode_parses_both_spellings() {
        let a: ViewMode = serde_json::from_str("\"first_person\"").unwrap();
        let b: ViewMode = serde_json::from_str("\"first-person\"").unwrap();
        assert_eq!(a, b);
    }
}

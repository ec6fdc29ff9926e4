use crate::scene::lighting::TimeOfDay;
use crate::view::ViewMode;
use anyhow::{Context, Result};
use glam::Vec3;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.json";

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,
    #[serde(default = "WindowConfig::default_width")]
    pub width: u32,
    #[serde(default = "WindowConfig::default_height")]
    pub height: u32,
    #[serde(default = "WindowConfig::default_vsync")]
    pub vsync: bool,
    #[serde(default)]
    pub fullscreen: bool,
}

impl WindowConfig {
    fn default_title() -> String {
        "Campus Viewer".to_string()
    }

    const fn default_width() -> u32 {
        1280
    }

    const fn default_height() -> u32 {
        720
    }

    const fn default_vsync() -> bool {
        true
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            width: Self::default_width(),
            height: Self::default_height(),
            vsync: Self::default_vsync(),
            fullscreen: false,
        }
    }
}

/// Initial values for the per-session view state.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub time_of_day: TimeOfDay,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default = "SessionConfig::default_show_labels")]
    pub show_labels: bool,
    #[serde(default)]
    pub low_graphics: bool,
}

impl SessionConfig {
    const fn default_show_labels() -> bool {
        true
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_of_day: TimeOfDay::default(),
            view_mode: ViewMode::default(),
            show_labels: Self::default_show_labels(),
            low_graphics: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrbitalConfig {
    #[serde(default = "OrbitalConfig::default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "OrbitalConfig::default_position")]
    pub position: Vec3,
    #[serde(default = "OrbitalConfig::default_target")]
    pub target: Vec3,
    #[serde(default = "OrbitalConfig::default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "OrbitalConfig::default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "OrbitalConfig::default_max_polar_angle")]
    pub max_polar_angle: f32,
    #[serde(default = "OrbitalConfig::default_drag_sensitivity")]
    pub drag_sensitivity: f32,
    /// Fraction of the pending orbit motion applied per update.
    #[serde(default = "OrbitalConfig::default_damping_factor")]
    pub damping_factor: f32,
}

impl OrbitalConfig {
    const fn default_fov() -> f32 {
        60.0
    }

    const fn default_position() -> Vec3 {
        Vec3::new(0.0, 60.0, -20.0)
    }

    const fn default_target() -> Vec3 {
        Vec3::new(0.0, 0.0, 20.0)
    }

    const fn default_min_distance() -> f32 {
        20.0
    }

    const fn default_max_distance() -> f32 {
        150.0
    }

    fn default_max_polar_angle() -> f32 {
        std::f32::consts::PI / 2.1
    }

    const fn default_drag_sensitivity() -> f32 {
        0.005
    }

    const fn default_damping_factor() -> f32 {
        0.05
    }
}

impl Default for OrbitalConfig {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov(),
            position: Self::default_position(),
            target: Self::default_target(),
            min_distance: Self::default_min_distance(),
            max_distance: Self::default_max_distance(),
            max_polar_angle: Self::default_max_polar_angle(),
            drag_sensitivity: Self::default_drag_sensitivity(),
            damping_factor: Self::default_damping_factor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirstPersonConfig {
    #[serde(default = "FirstPersonConfig::default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "FirstPersonConfig::default_eye_height")]
    pub eye_height: f32,
    #[serde(default = "FirstPersonConfig::default_spawn_position")]
    pub spawn_position: Vec3,
    #[serde(default)]
    pub spawn_yaw: f32,
    #[serde(default = "FirstPersonConfig::default_look_sensitivity")]
    pub look_sensitivity: f32,
}

impl FirstPersonConfig {
    const fn default_fov() -> f32 {
        75.0
    }

    const fn default_eye_height() -> f32 {
        1.7
    }

    const fn default_spawn_position() -> Vec3 {
        Vec3::new(0.0, 1.7, -30.0)
    }

    const fn default_look_sensitivity() -> f32 {
        0.002
    }
}

impl Default for FirstPersonConfig {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov(),
            eye_height: Self::default_eye_height(),
            spawn_position: Self::default_spawn_position(),
            spawn_yaw: 0.0,
            look_sensitivity: Self::default_look_sensitivity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementConfig {
    /// Target speed in units per second.
    #[serde(default = "MovementConfig::default_speed")]
    pub speed: f32,
    /// Exponential damping rate applied to velocity every frame.
    #[serde(default = "MovementConfig::default_damping")]
    pub damping: f32,
}

impl MovementConfig {
    const fn default_speed() -> f32 {
        10.0
    }

    const fn default_damping() -> f32 {
        10.0
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self { speed: Self::default_speed(), damping: Self::default_damping() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AvatarConfig {
    #[serde(default = "AvatarConfig::default_cycle_rate")]
    pub cycle_rate: f32,
    #[serde(default = "AvatarConfig::default_leg_amplitude")]
    pub leg_amplitude: f32,
    #[serde(default = "AvatarConfig::default_arm_amplitude")]
    pub arm_amplitude: f32,
    #[serde(default = "AvatarConfig::default_loading_seconds")]
    pub loading_seconds: f32,
}

impl AvatarConfig {
    const fn default_cycle_rate() -> f32 {
        5.0
    }

    const fn default_leg_amplitude() -> f32 {
        0.5
    }

    const fn default_arm_amplitude() -> f32 {
        0.3
    }

    const fn default_loading_seconds() -> f32 {
        0.1
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            cycle_rate: Self::default_cycle_rate(),
            leg_amplitude: Self::default_leg_amplitude(),
            arm_amplitude: Self::default_arm_amplitude(),
            loading_seconds: Self::default_loading_seconds(),
        }
    }
}

/// Thresholds for the graphics recovery policy. These were tuned by observation, so they stay
/// configurable.
#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default = "ResilienceConfig::default_reload_after_losses")]
    pub reload_after_consecutive_losses: u32,
    #[serde(default = "ResilienceConfig::default_low_graphics_after_losses")]
    pub low_graphics_after_losses: u32,
    #[serde(default = "ResilienceConfig::default_cleanup_ratio")]
    pub cleanup_memory_ratio: f64,
    #[serde(default = "ResilienceConfig::default_emergency_ratio")]
    pub emergency_memory_ratio: f64,
    #[serde(default = "ResilienceConfig::default_texture_limit")]
    pub texture_limit: u32,
    #[serde(default = "ResilienceConfig::default_geometry_limit")]
    pub geometry_limit: u32,
    #[serde(default = "ResilienceConfig::default_memory_poll_secs")]
    pub memory_poll_secs: f32,
    #[serde(default = "ResilienceConfig::default_initial_poll_delay_secs")]
    pub initial_poll_delay_secs: f32,
    #[serde(default = "ResilienceConfig::default_scheduled_cleanup_secs")]
    pub scheduled_cleanup_secs: f32,
    #[serde(default = "ResilienceConfig::default_context_loss_reload_delay_ms")]
    pub context_loss_reload_delay_ms: u64,
    #[serde(default = "ResilienceConfig::default_emergency_reload_delay_ms")]
    pub emergency_reload_delay_ms: u64,
}

impl ResilienceConfig {
    const fn default_reload_after_losses() -> u32 {
        5
    }

    const fn default_low_graphics_after_losses() -> u32 {
        3
    }

    const fn default_cleanup_ratio() -> f64 {
        0.80
    }

    const fn default_emergency_ratio() -> f64 {
        0.95
    }

    const fn default_texture_limit() -> u32 {
        100
    }

    const fn default_geometry_limit() -> u32 {
        500
    }

    const fn default_memory_poll_secs() -> f32 {
        15.0
    }

    const fn default_initial_poll_delay_secs() -> f32 {
        5.0
    }

    const fn default_scheduled_cleanup_secs() -> f32 {
        120.0
    }

    const fn default_context_loss_reload_delay_ms() -> u64 {
        3_000
    }

    const fn default_emergency_reload_delay_ms() -> u64 {
        2_000
    }

    pub fn context_loss_reload_delay(&self) -> Duration {
        Duration::from_millis(self.context_loss_reload_delay_ms)
    }

    pub fn emergency_reload_delay(&self) -> Duration {
        Duration::from_millis(self.emergency_reload_delay_ms)
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            reload_after_consecutive_losses: Self::default_reload_after_losses(),
            low_graphics_after_losses: Self::default_low_graphics_after_losses(),
            cleanup_memory_ratio: Self::default_cleanup_ratio(),
            emergency_memory_ratio: Self::default_emergency_ratio(),
            texture_limit: Self::default_texture_limit(),
            geometry_limit: Self::default_geometry_limit(),
            memory_poll_secs: Self::default_memory_poll_secs(),
            initial_poll_delay_secs: Self::default_initial_poll_delay_secs(),
            scheduled_cleanup_secs: Self::default_scheduled_cleanup_secs(),
            context_loss_reload_delay_ms: Self::default_context_loss_reload_delay_ms(),
            emergency_reload_delay_ms: Self::default_emergency_reload_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "GenerationConfig::default_poll_interval_secs")]
    pub poll_interval_secs: f32,
    #[serde(default = "GenerationConfig::default_max_attempts")]
    pub max_attempts: u32,
}

impl GenerationConfig {
    const fn default_poll_interval_secs() -> f32 {
        5.0
    }

    const fn default_max_attempts() -> u32 {
        60
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { poll_interval_secs: Self::default_poll_interval_secs(), max_attempts: Self::default_max_attempts() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "SceneConfig::default_tree_seed")]
    pub tree_seed: u64,
    #[serde(default = "SceneConfig::default_tree_scale_min")]
    pub tree_scale_min: f32,
    #[serde(default = "SceneConfig::default_tree_scale_max")]
    pub tree_scale_max: f32,
}

impl SceneConfig {
    const fn default_tree_seed() -> u64 {
        0x5eed_1746
    }

    const fn default_tree_scale_min() -> f32 {
        0.8
    }

    const fn default_tree_scale_max() -> f32 {
        1.3
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tree_seed: Self::default_tree_seed(),
            tree_scale_min: Self::default_tree_scale_min(),
            tree_scale_max: Self::default_tree_scale_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub orbital: OrbitalConfig,
    #[serde(default)]
    pub first_person: FirstPersonConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
    pub time_of_day: Option<TimeOfDay>,
    pub view_mode: Option<ViewMode>,
    pub low_graphics: Option<bool>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(error = ?err, "config load failed; falling back to defaults");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(vsync) = overrides.vsync {
            self.window.vsync = vsync;
        }
        if let Some(time_of_day) = overrides.time_of_day {
            self.session.time_of_day = time_of_day;
        }
        if let Some(view_mode) = overrides.view_mode {
            self.session.view_mode = view_mode;
        }
        if let Some(low_graphics) = overrides.low_graphics {
            self.session.low_graphics = low_graphics;
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.applied_fields().is_empty()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.vsync.is_some() {
            fields.push("vsync");
        }
        if self.time_of_day.is_some() {
            fields.push("time_of_day");
        }
        if self.view_mode.is_some() {
            fields.push("view_mode");
        }
        if self.low_graphics.is_some() {
            fields.push("low_graphics");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_section_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"movement": {"speed": 4.0}, "session": {"time_of_day": "night"}}"#)
                .expect("partial config parses");
        assert_eq!(cfg.movement.speed, 4.0);
        assert_eq!(cfg.movement.damping, 10.0);
        assert_eq!(cfg.session.time_of_day, TimeOfDay::Night);
        assert!(cfg.session.show_labels);
        assert_eq!(cfg.resilience.reload_after_consecutive_losses, 5);
        assert_eq!(cfg.generation.max_attempts, 60);
    }

    #[test]
    fn partial_window_section_keeps_other_sections() {
        let cfg: AppConfig = serde_json::from_str(r#"{"window": {"width": 800}, "movement": {"speed": 4.0}}"#)
            .expect("partial window section parses");
        assert_eq!(cfg.window.width, 800);
        assert_eq!(cfg.window.height, 720);
        assert_eq!(cfg.window.title, "Campus Viewer");
        assert!(cfg.window.vsync);
        assert!(!cfg.window.fullscreen);
        assert_eq!(cfg.movement.speed, 4.0);
    }

    #[test]
    fn overrides_replace_session_values() {
        let mut cfg = AppConfig::default();
        let overrides = AppConfigOverrides {
            view_mode: Some(ViewMode::FirstPerson),
            low_graphics: Some(true),
            ..Default::default()
        };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.session.view_mode, ViewMode::FirstPerson);
        assert!(cfg.session.low_graphics);
        assert_eq!(overrides.applied_fields(), vec!["view_mode", "low_graphics"]);
    }
}

use super::movement::PlayerPose;
use crate::config::{FirstPersonConfig, OrbitalConfig};
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::fmt;
use winit::dpi::PhysicalSize;

const DEFAULT_UP: Vec3 = Vec3::Y;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;
const MIN_POLAR: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self, viewport: PhysicalSize<u32>) -> Mat4 {
        let aspect = if viewport.height > 0 { viewport.width as f32 / viewport.height as f32 } else { 1.0 };
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// World-space ray from the camera through a pixel position.
    pub fn screen_ray(&self, screen: Vec2, viewport: PhysicalSize<u32>) -> Option<(Vec3, Vec3)> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let ndc_x = (2.0 * screen.x / viewport.width as f32) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen.y / viewport.height as f32);
        let inv_view_proj = self.view_projection(viewport).inverse();
        let world = inv_view_proj * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        if world.w.abs() < f32::EPSILON {
            return None;
        }
        let dir = ((world.truncate() / world.w) - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        Some((self.position, dir))
    }

    pub fn project_point(&self, point: Vec3, viewport: PhysicalSize<u32>) -> Option<Vec2> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let clip = self.view_projection(viewport) * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x + 1.0) * 0.5 * viewport.width as f32;
        let y = (1.0 - ndc.y) * 0.5 * viewport.height as f32;
        Some(Vec2::new(x, y))
    }
}

/// Named orbital viewpoints offered in the controls menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraPreset {
    Overview,
    StreetView,
    BirdsEye,
    CloseUp,
}

impl CameraPreset {
    pub const ALL: [CameraPreset; 4] =
        [CameraPreset::Overview, CameraPreset::StreetView, CameraPreset::BirdsEye, CameraPreset::CloseUp];

    pub fn position(self) -> Vec3 {
        match self {
            CameraPreset::Overview => Vec3::new(40.0, 35.0, 40.0),
            CameraPreset::StreetView => Vec3::new(0.0, 3.0, 35.0),
            CameraPreset::BirdsEye => Vec3::new(0.0, 80.0, 0.1),
            CameraPreset::CloseUp => Vec3::new(15.0, 15.0, 15.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CameraPreset::Overview => "Overview",
            CameraPreset::StreetView => "Street View",
            CameraPreset::BirdsEye => "Bird's Eye",
            CameraPreset::CloseUp => "Close Up",
        }
    }
}

impl fmt::Display for CameraPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Orbit around a fixed focal point in spherical coordinates.
/// `polar` is measured from straight up, `azimuth` around +Y starting at +Z.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    pub azimuth: f32,
    pub polar: f32,
    min_distance: f32,
    max_distance: f32,
    max_polar: f32,
    drag_sensitivity: f32,
    damping: f32,
    /// Orbit motion not yet applied: x = azimuth, y = polar.
    pending: Vec2,
    fov_y_radians: f32,
}

impl OrbitCamera {
    pub fn from_config(config: &OrbitalConfig) -> Self {
        let mut orbit = Self {
            target: config.target,
            radius: config.min_distance,
            azimuth: 0.0,
            polar: MIN_POLAR,
            min_distance: config.min_distance.max(0.01),
            max_distance: config.max_distance.max(config.min_distance.max(0.01)),
            max_polar: config.max_polar_angle.clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR),
            drag_sensitivity: config.drag_sensitivity,
            damping: config.damping_factor,
            pending: Vec2::ZERO,
            fov_y_radians: config.fov_degrees.to_radians(),
        };
        orbit.set_position(config.position);
        orbit
    }

    pub fn position(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        self.target
            + Vec3::new(
                self.radius * sin_polar * self.azimuth.sin(),
                self.radius * self.polar.cos(),
                self.radius * sin_polar * self.azimuth.cos(),
            )
    }

    /// Places the eye at `position`, keeping the target and clamping to the orbit bounds.
    pub fn set_position(&mut self, position: Vec3) {
        let offset = position - self.target;
        let radius = offset.length();
        if radius > f32::EPSILON {
            self.polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
            self.azimuth = offset.x.atan2(offset.z);
        }
        self.radius = radius.clamp(self.min_distance, self.max_distance);
        self.polar = self.polar.clamp(MIN_POLAR, self.max_polar);
        self.pending = Vec2::ZERO;
    }

    pub fn apply_preset(&mut self, preset: CameraPreset) {
        self.set_position(preset.position());
    }

    /// Queues orbit motion in radians; it is eased in by `update`.
    pub fn orbit(&mut self, delta: Vec2) {
        self.pending += delta;
    }

    pub fn drag(&mut self, pixels: Vec2) {
        self.orbit(-pixels * self.drag_sensitivity);
    }

    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.radius = (self.radius * factor).clamp(self.min_distance, self.max_distance);
        }
    }

    pub fn update(&mut self) {
        let applied = if self.damping > 0.0 && self.damping < 1.0 { self.pending * self.damping } else { self.pending };
        self.azimuth += applied.x;
        self.polar = (self.polar + applied.y).clamp(MIN_POLAR, self.max_polar);
        self.pending -= applied;
        if self.pending.length_squared() < 1e-10 {
            self.pending = Vec2::ZERO;
        }
    }

    pub fn max_polar(&self) -> f32 {
        self.max_polar
    }

    pub fn distance_bounds(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }

    pub fn to_camera(&self) -> Camera3D {
        Camera3D::new(self.position(), self.target, self.fov_y_radians, NEAR_PLANE, FAR_PLANE)
    }
}

/// Eye-level camera bound to the player pose. Only pitch lives here; yaw belongs to the pose.
#[derive(Debug, Clone)]
pub struct FirstPersonRig {
    pub fov_y_radians: f32,
    pub eye_height: f32,
    pub pitch: f32,
    look_sensitivity: f32,
}

impl FirstPersonRig {
    pub fn from_config(config: &FirstPersonConfig) -> Self {
        Self {
            fov_y_radians: config.fov_degrees.to_radians(),
            eye_height: config.eye_height,
            pitch: 0.0,
            look_sensitivity: config.look_sensitivity,
        }
    }

    pub fn look(&mut self, pose: &mut PlayerPose, pixels: Vec2) {
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        if let Some(yaw) = crate::wrap_angle(pose.yaw - pixels.x * self.look_sensitivity) {
            pose.yaw = yaw;
        }
        let pitch = self.pitch - pixels.y * self.look_sensitivity;
        if pitch.is_finite() {
            self.pitch = pitch.clamp(-limit, limit);
        }
    }

    pub fn reset(&mut self) {
        self.pitch = 0.0;
    }

    pub fn look_direction(&self, pose: &PlayerPose) -> Vec3 {
        let (sin_yaw, cos_yaw) = pose.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch)
    }

    pub fn to_camera(&self, pose: &PlayerPose) -> Camera3D {
        let eye = Vec3::new(pose.position.x, self.eye_height, pose.position.z);
        Camera3D::new(eye, eye + self.look_direction(pose), self.fov_y_radians, NEAR_PLANE, FAR_PLANE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflowing_look_keeps_previous_heading() {
        let config = FirstPersonConfig { look_sensitivity: f32::MAX, ..FirstPersonConfig::default() };
        let mut rig = FirstPersonRig::from_config(&config);
        let mut pose = PlayerPose::new(Vec3::new(0.0, 1.7, -30.0), 0.4);
        rig.look(&mut pose, Vec2::new(10.0, -10.0));
        assert_eq!(pose.yaw, 0.4);
        assert!(rig.look_direction(&pose).is_finite());
    }

    #[test]
    fn camera3d_view_projection_is_finite() {
        let camera = Camera3D::new(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, 60.0_f32.to_radians(), 0.1, 1000.0);
        let vp = camera.view_projection(PhysicalSize::new(1280, 720));
        assert!(vp.to_cols_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn centre_ray_points_at_target() {
        let camera = Camera3D::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 0.0, 10.0), 1.0, 0.1, 1000.0);
        let (origin, dir) = camera.screen_ray(Vec2::new(640.0, 360.0), PhysicalSize::new(1280, 720)).unwrap();
        let expected = (camera.target - origin).normalize();
        assert!(dir.dot(expected) > 0.999);
        assert!(camera.screen_ray(Vec2::ZERO, PhysicalSize::new(0, 720)).is_none());
    }

    #[test]
    fn default_orbit_starts_at_configured_eye() {
        let orbit = OrbitCamera::from_config(&OrbitalConfig::default());
        assert!(orbit.position().distance(Vec3::new(0.0, 60.0, -20.0)) < 1e-3);
    }

    #[test]
    fn presets_are_clamped_to_orbit_bounds() {
        let mut orbit = OrbitCamera::from_config(&OrbitalConfig::default());
        orbit.apply_preset(CameraPreset::StreetView);
        assert!((orbit.radius - 20.0).abs() < 1e-4);
        orbit.apply_preset(CameraPreset::Overview);
        assert!(orbit.position().distance(CameraPreset::Overview.position()) < 1e-3);
    }

    #[test]
    fn orbit_never_dips_below_the_horizon_cap() {
        let mut orbit = OrbitCamera::from_config(&OrbitalConfig::default());
        orbit.orbit(Vec2::new(0.0, 10.0));
        for _ in 0..500 {
            orbit.update();
        }
        assert!((orbit.polar - orbit.max_polar()).abs() < 1e-5);
        assert!(orbit.position().y > orbit.target.y);
    }

    #[test]
    fn zoom_respects_distance_bounds() {
        let mut orbit = OrbitCamera::from_config(&OrbitalConfig::default());
        orbit.zoom(100.0);
        assert_eq!(orbit.radius, 150.0);
        orbit.zoom(0.001);
        assert_eq!(orbit.radius, 20.0);
    }

    #[test]
    fn first_person_looks_down_positive_z_at_zero_yaw() {
        let rig = FirstPersonRig::from_config(&FirstPersonConfig::default());
        let pose = PlayerPose::new(Vec3::new(0.0, 1.7, -30.0), 0.0);
        let camera = rig.to_camera(&pose);
        assert!((camera.target - camera.position - Vec3::Z).length() < 1e-6);
        assert_eq!(camera.position.y, 1.7);
    }
}

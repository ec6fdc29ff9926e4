//! Procedural walk cycle for the humanoid avatar plus the choice of which avatar body to show.
//!
//! Animation is split into a pure angle function and a small stateful phase accumulator so the
//! gait can be checked without a renderer. A renderer applies the result through [`RigPose`].

use crate::config::AvatarConfig;
use glam::{Quat, Vec3};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl Joint {
    pub const ALL: [Joint; 4] = [Joint::LeftArm, Joint::RightArm, Joint::LeftLeg, Joint::RightLeg];

    /// Pivot in avatar-local space. The avatar faces +Z, so its left side is +X.
    pub fn pivot(self) -> Vec3 {
        match self {
            Joint::LeftArm => Vec3::new(0.25, 1.35, 0.0),
            Joint::RightArm => Vec3::new(-0.25, 1.35, 0.0),
            Joint::LeftLeg => Vec3::new(0.1, 0.65, 0.0),
            Joint::RightLeg => Vec3::new(-0.1, 0.65, 0.0),
        }
    }

    fn slot(self) -> usize {
        match self {
            Joint::LeftArm => 0,
            Joint::RightArm => 1,
            Joint::LeftLeg => 2,
            Joint::RightLeg => 3,
        }
    }
}

/// Rotation about each joint's local X axis, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointAngles {
    pub left_leg: f32,
    pub right_leg: f32,
    pub left_arm: f32,
    pub right_arm: f32,
}

impl JointAngles {
    pub const NEUTRAL: JointAngles = JointAngles { left_leg: 0.0, right_leg: 0.0, left_arm: 0.0, right_arm: 0.0 };

    pub fn get(&self, joint: Joint) -> f32 {
        match joint {
            Joint::LeftArm => self.left_arm,
            Joint::RightArm => self.right_arm,
            Joint::LeftLeg => self.left_leg,
            Joint::RightLeg => self.right_leg,
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    pub fn apply_to(&self, rig: &mut dyn RigPose) {
        for joint in Joint::ALL {
            rig.set_joint_rotation(joint, self.get(joint));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitParams {
    pub cycle_rate: f32,
    pub leg_amplitude: f32,
    pub arm_amplitude: f32,
}

impl From<&AvatarConfig> for GaitParams {
    fn from(config: &AvatarConfig) -> Self {
        Self {
            cycle_rate: config.cycle_rate,
            leg_amplitude: config.leg_amplitude,
            arm_amplitude: config.arm_amplitude,
        }
    }
}

impl Default for GaitParams {
    fn default() -> Self {
        Self::from(&AvatarConfig::default())
    }
}

/// Contralateral gait: legs mirror each other and each arm swings against the leg on its side.
/// Standing still snaps every joint to zero.
pub fn joint_angles(phase: f32, moving: bool, params: &GaitParams) -> JointAngles {
    if !moving {
        return JointAngles::NEUTRAL;
    }
    let swing = phase.sin();
    let leg = swing * params.leg_amplitude;
    let arm = swing * params.arm_amplitude;
    JointAngles { left_leg: leg, right_leg: -leg, left_arm: -arm, right_arm: arm }
}

/// Phase accumulator. The phase only advances while moving and is kept when the avatar stops.
#[derive(Debug, Clone)]
pub struct WalkCycle {
    phase: f32,
    params: GaitParams,
}

impl WalkCycle {
    pub fn new(params: GaitParams) -> Self {
        Self { phase: 0.0, params }
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn tick(&mut self, dt: f32, moving: bool) -> JointAngles {
        if moving && dt.is_finite() && dt > 0.0 {
            self.phase += dt * self.params.cycle_rate;
        }
        joint_angles(self.phase, moving, &self.params)
    }
}

/// Renderer-side joint handles.
pub trait RigPose {
    fn set_joint_rotation(&mut self, joint: Joint, radians: f32);
}

/// Joint rotations as quaternions, ready to upload as bone transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonPose {
    rotations: [Quat; 4],
}

impl Default for SkeletonPose {
    fn default() -> Self {
        Self { rotations: [Quat::IDENTITY; 4] }
    }
}

impl SkeletonPose {
    pub fn rotation(&self, joint: Joint) -> Quat {
        self.rotations[joint.slot()]
    }
}

impl RigPose for SkeletonPose {
    fn set_joint_rotation(&mut self, joint: Joint, radians: f32) {
        self.rotations[joint.slot()] = Quat::from_rotation_x(radians);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarVariant {
    /// Placeholder shown briefly before the detailed body is ready.
    Loading,
    Realistic,
    /// Cube body used after the detailed one failed to render.
    Fallback,
}

/// Picks which avatar body to draw. A render failure is final for the session.
#[derive(Debug, Clone)]
pub struct AvatarPresenter {
    variant: AvatarVariant,
    loading_left: f32,
}

impl AvatarPresenter {
    pub fn new(config: &AvatarConfig) -> Self {
        Self { variant: AvatarVariant::Loading, loading_left: config.loading_seconds.max(0.0) }
    }

    pub fn variant(&self) -> AvatarVariant {
        self.variant
    }

    pub fn tick(&mut self, dt: f32) -> AvatarVariant {
        if self.variant == AvatarVariant::Loading {
            self.loading_left -= dt.max(0.0);
            if self.loading_left <= 0.0 {
                self.variant = AvatarVariant::Realistic;
                debug!("avatar ready");
            }
        }
        self.variant
    }

    pub fn report_render_error(&mut self, detail: &str) {
        if self.variant != AvatarVariant::Fallback {
            warn!(detail, "avatar render failed; switching to fallback body");
        }
        self.variant = AvatarVariant::Fallback;
    }
}

pub const DEFAULT_AVATAR: &str = "default";

/// Where the avatar model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarSource {
    Model { url: String },
    Default,
}

impl AvatarSource {
    /// A stored model URL wins; anything else, including a failed generation or denied camera,
    /// lands on the built-in avatar.
    pub fn resolve(avatar_url: Option<&str>) -> Self {
        match avatar_url.map(str::trim) {
            Some(url) if !url.is_empty() && url != DEFAULT_AVATAR => AvatarSource::Model { url: url.to_string() },
            _ => AvatarSource::Default,
        }
    }

    pub fn camera_denied() -> Self {
        warn!("camera access denied; using default avatar");
        AvatarSource::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legs_mirror_and_arms_oppose_same_side_leg() {
        let angles = joint_angles(1.0, true, &GaitParams::default());
        assert!((angles.left_leg - 1.0f32.sin() * 0.5).abs() < 1e-6);
        assert_eq!(angles.right_leg, -angles.left_leg);
        assert_eq!(angles.right_arm, -angles.left_arm);
        assert!(angles.left_arm.signum() != angles.left_leg.signum());
        assert!((angles.right_arm - 1.0f32.sin() * 0.3).abs() < 1e-6);
    }

    #[test]
    fn stopping_snaps_to_neutral_but_holds_phase() {
        let mut cycle = WalkCycle::new(GaitParams::default());
        for _ in 0..10 {
            cycle.tick(0.05, true);
        }
        let phase = cycle.phase();
        assert!((phase - 2.5).abs() < 1e-4);
        assert!(cycle.tick(0.05, false).is_neutral());
        assert_eq!(cycle.phase(), phase);
        let resumed = cycle.tick(0.0, true);
        assert!((resumed.left_leg - phase.sin() * 0.5).abs() < 1e-6);
    }

    #[test]
    fn angles_are_applied_as_x_rotations() {
        let mut pose = SkeletonPose::default();
        JointAngles { left_leg: 0.5, ..JointAngles::NEUTRAL }.apply_to(&mut pose);
        assert!(pose.rotation(Joint::LeftLeg).abs_diff_eq(Quat::from_rotation_x(0.5), 1e-6));
        assert_eq!(pose.rotation(Joint::RightArm), Quat::IDENTITY);
    }

    #[test]
    fn presenter_finishes_loading_then_falls_back_on_error() {
        let mut presenter = AvatarPresenter::new(&AvatarConfig::default());
        assert_eq!(presenter.tick(0.05), AvatarVariant::Loading);
        assert_eq!(presenter.tick(0.06), AvatarVariant::Realistic);
        presenter.report_render_error("mesh upload failed");
        assert_eq!(presenter.tick(1.0), AvatarVariant::Fallback);
    }

    #[test]
    fn avatar_source_prefers_stored_model() {
        assert_eq!(
            AvatarSource::resolve(Some("https://cdn.example/model.glb")),
            AvatarSource::Model { url: "https://cdn.example/model.glb".to_string() }
        );
        assert_eq!(AvatarSource::resolve(Some("  ")), AvatarSource::Default);
        assert_eq!(AvatarSource::resolve(None), AvatarSource::Default);
    }
}

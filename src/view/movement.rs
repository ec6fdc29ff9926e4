use crate::config::{FirstPersonConfig, MovementConfig};
use glam::{Vec2, Vec3};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// Currently held movement keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementState {
    pub fn set(&mut self, direction: MoveDirection, held: bool) {
        match direction {
            MoveDirection::Forward => self.forward = held,
            MoveDirection::Backward => self.backward = held,
            MoveDirection::Left => self.left = held,
            MoveDirection::Right => self.right = held,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    /// Raw input axis: x = right - left, y = forward - backward. Not normalized.
    pub fn axis(&self) -> Vec2 {
        Vec2::new(
            f32::from(u8::from(self.right)) - f32::from(u8::from(self.left)),
            f32::from(u8::from(self.forward)) - f32::from(u8::from(self.backward)),
        )
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Position and heading of the walker. Yaw 0 faces +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPose {
    pub position: Vec3,
    pub yaw: f32,
}

impl PlayerPose {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self { position, yaw }
    }

    pub fn forward(&self) -> Vec3 {
        let (sin, cos) = self.yaw.sin_cos();
        Vec3::new(sin, 0.0, cos)
    }

    pub fn right(&self) -> Vec3 {
        let (sin, cos) = self.yaw.sin_cos();
        Vec3::new(-cos, 0.0, sin)
    }

    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.forward() * distance;
    }

    pub fn move_right(&mut self, distance: f32) {
        self.position += self.right() * distance;
    }
}

/// Damped-velocity integrator for first-person walking.
#[derive(Debug, Clone)]
pub struct MovementController {
    state: MovementState,
    pose: PlayerPose,
    spawn: PlayerPose,
    /// x = strafe, y = forward.
    velocity: Vec2,
    speed: f32,
    damping: f32,
    eye_height: f32,
}

impl MovementController {
    pub fn new(movement: &MovementConfig, first_person: &FirstPersonConfig) -> Self {
        let spawn = PlayerPose::new(
            Vec3::new(first_person.spawn_position.x, first_person.eye_height, first_person.spawn_position.z),
            first_person.spawn_yaw,
        );
        Self {
            state: MovementState::default(),
            pose: spawn,
            spawn,
            velocity: Vec2::ZERO,
            speed: movement.speed,
            damping: movement.damping.max(0.0),
            eye_height: first_person.eye_height,
        }
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    pub fn pose(&self) -> PlayerPose {
        self.pose
    }

    pub fn pose_mut(&mut self) -> &mut PlayerPose {
        &mut self.pose
    }

    pub fn spawn(&self) -> PlayerPose {
        self.spawn
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn set_key(&mut self, direction: MoveDirection, held: bool) {
        self.state.set(direction, held);
    }

    /// Clears held keys and velocity and puts the walker back at the spawn pose.
    pub fn reset(&mut self) {
        self.state.reset();
        self.velocity = Vec2::ZERO;
        self.pose = self.spawn;
        debug!(x = self.pose.position.x, z = self.pose.position.z, "movement reset to spawn");
    }

    /// Advances one frame. Velocity decays as `v -= v * k * dt`, then accelerates along the held
    /// direction; with no keys held only the decay applies.
    pub fn step(&mut self, dt: f32) -> PlayerPose {
        if !(dt.is_finite() && dt > 0.0) {
            self.pose.position.y = self.eye_height;
            return self.pose;
        }
        let decay = (self.damping * dt).min(1.0);
        self.velocity -= self.velocity * decay;

        let axis = self.state.axis();
        if axis != Vec2::ZERO {
            self.velocity += axis.normalize() * self.speed * dt;
        }

        self.pose.move_right(self.velocity.x * dt);
        self.pose.move_forward(self.velocity.y * dt);
        self.pose.position.y = self.eye_height;
        self.pose
    }
}

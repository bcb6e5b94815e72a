//! Kinematic body component.
//!
//! The [`RigidBody`] component stores the velocity the movement system
//! integrates and the collision pipeline reads and corrects. The `frozen`
//! flag disables integration, useful when an entity's position is controlled
//! externally.

use bevy_ecs::prelude::Component;
use glam::Vec2;
use log::warn;

/// Kinematic body storing velocity and simple damping.
///
/// Updated by gameplay code and the collision pipeline, consumed by the
/// movement system to update [`MapPosition`](super::mapposition::MapPosition).
///
/// # Fields
/// - `velocity` - Current velocity in world units per second
/// - `friction` - Velocity damping factor (0.0 = no friction, higher = more drag)
/// - `max_speed` - Optional maximum speed clamp
/// - `frozen` - When true, movement system skips all calculations for this entity
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct RigidBody {
    /// Current velocity in world units per second.
    pub velocity: Vec2,
    /// Velocity damping factor. Applied as: velocity *= (1 - friction * delta).
    pub friction: f32,
    /// Optional maximum speed. If set, velocity magnitude is clamped to this value.
    pub max_speed: Option<f32>,
    /// When true, movement system leaves this entity alone.
    pub frozen: bool,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidBody {
    /// Create a RigidBody with zero velocity.
    pub fn new() -> Self {
        Self {
            velocity: Vec2::ZERO,
            friction: 0.0,
            max_speed: None,
            frozen: false,
        }
    }

    pub fn with_velocity(velocity: Vec2) -> Self {
        Self {
            velocity,
            ..Self::new()
        }
    }

    /// Create a RigidBody with physics parameters configured.
    ///
    /// # Arguments
    /// * `friction` - Velocity damping (0.0 = none, ~5.0 = responsive, ~10.0 = heavy)
    /// * `max_speed` - Optional velocity magnitude limit
    pub fn with_physics(friction: f32, max_speed: Option<f32>) -> Self {
        Self {
            friction,
            max_speed,
            ..Self::new()
        }
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    /// Set speed while maintaining the current direction of velocity.
    ///
    /// If the current velocity is zero, this is a no-op since there's no
    /// direction to maintain.
    pub fn set_speed(&mut self, new_speed: f32) {
        match self.velocity.try_normalize() {
            Some(direction) => self.velocity = direction * new_speed,
            None => warn!("RigidBody::set_speed called with zero velocity - operation ignored"),
        }
    }

    /// Velocity after one step of damping and clamping.
    pub fn damped_velocity(&self, delta: f32) -> Vec2 {
        let mut velocity = self.velocity;
        if self.friction > 0.0 {
            velocity *= (1.0 - self.friction * delta).max(0.0);
        }
        if let Some(max) = self.max_speed {
            velocity = velocity.clamp_length_max(max.max(0.0));
        }
        velocity
    }
}

//! Axis-aligned box collider component.
//!
//! The box is placed at the entity's [`MapPosition`](super::mapposition::MapPosition)
//! plus `offset`. Layer, flags, mass and an optional preferred response are
//! what the collision pipeline reads through
//! [`BoxCollider::collider_info`].

use bevy_ecs::prelude::Component;
use glam::Vec2;

use crate::collision::{BodyFlags, ColliderInfo, CollisionLayer, Rect, ResponseType};

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct BoxCollider {
    pub size: Vec2,
    pub offset: Vec2,
    pub layer: CollisionLayer,
    pub flags: BodyFlags,
    pub mass: f32,
    /// Response to use instead of the default classification.
    pub response: Option<ResponseType>,
}

impl BoxCollider {
    /// Solid, movable box of the given size on the default layer.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            offset: Vec2::ZERO,
            layer: CollisionLayer::DEFAULT,
            flags: BodyFlags::default(),
            mass: 1.0,
            response: None,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_layer(mut self, layer: CollisionLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_flags(mut self, flags: BodyFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_response(mut self, response: ResponseType) -> Self {
        self.response = Some(response);
        self
    }

    /// Immovable solid scenery.
    pub fn fixed(mut self) -> Self {
        self.flags = BodyFlags::fixed();
        self.mass = 0.0;
        self
    }

    /// Trigger volume: reports overlaps, never pushes back.
    pub fn sensor(mut self) -> Self {
        self.flags = BodyFlags::sensor();
        self
    }

    /// Returns (min, max) of the collider AABB for a given entity position.
    /// Handles negative size by normalizing to proper min/max.
    pub fn aabb(&self, position: Vec2) -> (Vec2, Vec2) {
        let p0 = position + self.offset;
        let p1 = p0 + self.size;
        (p0.min(p1), p0.max(p1))
    }

    pub fn to_rect(&self, position: Vec2) -> Rect {
        let (min, max) = self.aabb(position);
        Rect::from_corners(min, max)
    }

    /// AABB vs AABB overlap test against another BoxCollider at a different entity position.
    pub fn overlaps(&self, position: Vec2, other: &Self, other_position: Vec2) -> bool {
        let (min_a, max_a) = self.aabb(position);
        let (min_b, max_b) = other.aabb(other_position);
        min_a.x < max_b.x && max_a.x > min_b.x && min_a.y < max_b.y && max_a.y > min_b.y
    }

    /// Point containment in world space.
    pub fn contains_point(&self, position: Vec2, point: Vec2) -> bool {
        let (min, max) = self.aabb(position);
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Snapshot handed to the collision pipeline.
    pub fn collider_info(&self, position: Vec2) -> ColliderInfo {
        let info = ColliderInfo::new(self.to_rect(position), self.layer)
            .with_flags(self.flags)
            .with_mass(self.mass);
        match self.response {
            Some(response) => info.with_response(response),
            None => info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_with_offset() {
        let collider = BoxCollider::new(10.0, 20.0).with_offset(Vec2::new(-5.0, -10.0));
        let (min, max) = collider.aabb(Vec2::new(100.0, 100.0));
        assert_eq!(min, Vec2::new(95.0, 90.0));
        assert_eq!(max, Vec2::new(105.0, 110.0));
    }

    #[test]
    fn test_negative_size_normalized() {
        let collider = BoxCollider::new(-10.0, 10.0);
        let rect = collider.to_rect(Vec2::ZERO);
        assert_eq!(rect, Rect::new(-10.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_overlaps_excludes_touching() {
        let a = BoxCollider::new(10.0, 10.0);
        assert!(a.overlaps(Vec2::ZERO, &a, Vec2::new(9.0, 0.0)));
        assert!(!a.overlaps(Vec2::ZERO, &a, Vec2::new(10.0, 0.0)));
    }

    #[test]
    fn test_contains_point_inclusive() {
        let a = BoxCollider::new(10.0, 10.0);
        assert!(a.contains_point(Vec2::ZERO, Vec2::new(10.0, 10.0)));
        assert!(!a.contains_point(Vec2::ZERO, Vec2::new(10.1, 5.0)));
    }

    #[test]
    fn test_collider_info() {
        let wall = BoxCollider::new(32.0, 32.0)
            .with_layer(CollisionLayer::WALL)
            .fixed();
        let info = wall.collider_info(Vec2::new(16.0, 0.0));
        assert_eq!(info.bounds, Rect::new(16.0, 0.0, 32.0, 32.0));
        assert_eq!(info.layer, CollisionLayer::WALL);
        assert!(info.flags.is_static);
        assert_eq!(info.mass, 0.0);
        assert_eq!(info.response, None);

        let ball = BoxCollider::new(4.0, 4.0).with_response(ResponseType::Bounce);
        assert_eq!(
            ball.collider_info(Vec2::ZERO).response,
            Some(ResponseType::Bounce)
        );
    }
}

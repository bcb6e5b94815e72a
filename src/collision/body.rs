//! Per-collider data the pipeline reads from the external world each frame.

use super::layers::CollisionLayer;
use super::rect::Rect;
use super::response::ResponseType;

/// Physical behaviour flags of a collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyFlags {
    /// Takes part in physical resolution.
    pub solid: bool,
    /// Only raises trigger events, never a physical response.
    pub trigger: bool,
    /// Never moved by the resolver.
    pub is_static: bool,
    /// May push other bodies out of the way.
    pub can_push: bool,
    /// May be moved by a pushing body.
    pub can_be_pushed: bool,
}

impl Default for BodyFlags {
    fn default() -> Self {
        Self {
            solid: true,
            trigger: false,
            is_static: false,
            can_push: false,
            can_be_pushed: true,
        }
    }
}

impl BodyFlags {
    /// Solid, immovable scenery.
    pub fn fixed() -> Self {
        Self {
            is_static: true,
            can_be_pushed: false,
            ..Self::default()
        }
    }

    /// Non-solid volume that only reports overlaps.
    pub fn sensor() -> Self {
        Self {
            solid: false,
            trigger: true,
            can_be_pushed: false,
            ..Self::default()
        }
    }
}

/// Snapshot of a collider's collision capability for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderInfo {
    /// World-space bounds.
    pub bounds: Rect,
    pub layer: CollisionLayer,
    pub flags: BodyFlags,
    /// Mass used by mass-weighted responses. Never negative.
    pub mass: f32,
    /// Response requested by this collider instead of the default
    /// classification (e.g. bouncing projectiles).
    pub response: Option<ResponseType>,
}

impl ColliderInfo {
    pub fn new(bounds: Rect, layer: CollisionLayer) -> Self {
        Self {
            bounds,
            layer,
            flags: BodyFlags::default(),
            mass: 1.0,
            response: None,
        }
    }

    pub fn with_flags(mut self, flags: BodyFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Negative and NaN masses are stored as zero.
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = if mass.is_nan() { 0.0 } else { mass.max(0.0) };
        self
    }

    pub fn with_response(mut self, response: ResponseType) -> Self {
        self.response = Some(response);
        self
    }
}

//! Collision response strategies.
//!
//! [`ResponseResolver::classify`] picks the default response for a pair of
//! bodies; [`ResponseResolver::resolve`] applies any response to two
//! [`BodyState`]s. The resolver never talks to the world: the pipeline copies
//! positions and velocities into `BodyState`, resolves, and writes back what
//! changed.
//!
//! Rules shared by every strategy:
//! - a body without a position is never moved, one without a velocity never
//!   has its velocity changed;
//! - a static body is never moved;
//! - a degenerate collision normal (coincident centres) becomes `(1, 0)`.

use glam::Vec2;

use super::body::BodyFlags;
use super::narrowphase::{collision_normal, compute_mtv};
use super::rect::Rect;

/// Fraction of the pusher's velocity handed to the pushed body.
pub const DEFAULT_PUSH_TRANSFER: f32 = 0.5;

/// Physical response applied to a colliding pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// No physical response; triggers only raise events.
    None,
    /// Zero both velocities.
    Stop,
    /// Reflect velocities along the centre-to-centre normal.
    Bounce,
    /// Remove the normal component of the mover's velocity.
    Slide,
    /// A pushing body moves a pushable one out of the way.
    Push,
    /// Split the minimum translation between both bodies by mass.
    Separate,
}

/// Mutable view of one body during resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub bounds: Rect,
    pub flags: BodyFlags,
    pub mass: f32,
    pub position: Option<Vec2>,
    pub velocity: Option<Vec2>,
}

impl BodyState {
    pub fn new(bounds: Rect, flags: BodyFlags, mass: f32) -> Self {
        Self {
            bounds,
            flags,
            mass,
            position: None,
            velocity: None,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Move the body and its bounds by `delta`.
    ///
    /// Returns `false` without changing anything for static bodies and bodies
    /// without a position.
    pub fn translate(&mut self, delta: Vec2) -> bool {
        if self.flags.is_static || delta == Vec2::ZERO {
            return false;
        }
        let Some(position) = self.position.as_mut() else {
            return false;
        };
        *position += delta;
        self.bounds = self.bounds.translated(delta);
        true
    }

    fn velocity_or_zero(&self) -> Vec2 {
        self.velocity.unwrap_or(Vec2::ZERO)
    }
}

/// Chooses and applies collision responses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseResolver {
    push_transfer: f32,
}

impl Default for ResponseResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseResolver {
    pub fn new() -> Self {
        Self {
            push_transfer: DEFAULT_PUSH_TRANSFER,
        }
    }

    pub fn with_push_transfer(push_transfer: f32) -> Self {
        Self { push_transfer }
    }

    pub fn push_transfer(&self) -> f32 {
        self.push_transfer
    }

    /// Default response for a pair:
    /// 1. either is a trigger → [`ResponseType::None`]
    /// 2. either can push → [`ResponseType::Push`]
    /// 3. both solid → [`ResponseType::Separate`]
    /// 4. otherwise → [`ResponseType::Stop`]
    pub fn classify(a: &BodyFlags, b: &BodyFlags) -> ResponseType {
        if a.trigger || b.trigger {
            ResponseType::None
        } else if a.can_push || b.can_push {
            ResponseType::Push
        } else if a.solid && b.solid {
            ResponseType::Separate
        } else {
            ResponseType::Stop
        }
    }

    /// Apply `response` to the pair. Returns `true` if either body changed.
    pub fn resolve(&self, response: ResponseType, a: &mut BodyState, b: &mut BodyState) -> bool {
        match response {
            ResponseType::None => false,
            ResponseType::Stop => Self::stop(a, b),
            ResponseType::Bounce => Self::bounce(a, b),
            ResponseType::Slide => Self::slide(a, b),
            ResponseType::Push => self.push(a, b),
            ResponseType::Separate => Self::separate(a, b),
        }
    }

    /// Zero both velocities.
    pub fn stop(a: &mut BodyState, b: &mut BodyState) -> bool {
        let mut changed = false;
        for body in [a, b] {
            if let Some(v) = body.velocity.as_mut() {
                changed |= *v != Vec2::ZERO;
                *v = Vec2::ZERO;
            }
        }
        changed
    }

    /// Split the MTV between the bodies, each moving by the other's share of
    /// the combined mass (the heavier body moves less).
    ///
    /// A static body takes no share; when exactly one side is static the
    /// other side takes the whole MTV. If the combined mass is not positive
    /// the MTV is split evenly.
    pub fn separate(a: &mut BodyState, b: &mut BodyState) -> bool {
        let mtv = compute_mtv(&a.bounds, &b.bounds);
        if mtv == Vec2::ZERO {
            return false;
        }

        let (ratio_a, ratio_b) = match (a.flags.is_static, b.flags.is_static) {
            (true, true) => return false,
            (false, true) => (1.0, 0.0),
            (true, false) => (0.0, 1.0),
            (false, false) => {
                let total = a.mass + b.mass;
                if total > 0.0 {
                    (b.mass / total, a.mass / total)
                } else {
                    (0.5, 0.5)
                }
            }
        };

        let moved_a = a.translate(mtv * ratio_a);
        let moved_b = b.translate(-mtv * ratio_b);
        moved_a || moved_b
    }

    /// `a` pushes `b` if allowed, otherwise `b` pushes `a`.
    ///
    /// The pushed body moves by its own full MTV out of the pusher and
    /// receives `push_transfer` × the pusher's velocity. Requires the pusher
    /// to have `can_push`, the pushed body to have `can_be_pushed` and not be
    /// static. Returns `false` when no push happened.
    pub fn push(&self, a: &mut BodyState, b: &mut BodyState) -> bool {
        if Self::can_push(a, b) {
            self.push_one(a, b)
        } else if Self::can_push(b, a) {
            self.push_one(b, a)
        } else {
            false
        }
    }

    fn can_push(pusher: &BodyState, pushed: &BodyState) -> bool {
        pusher.flags.can_push && pushed.flags.can_be_pushed && !pushed.flags.is_static
    }

    fn push_one(&self, pusher: &BodyState, pushed: &mut BodyState) -> bool {
        let mtv = compute_mtv(&pushed.bounds, &pusher.bounds);
        let moved = pushed.translate(mtv);

        let transfer = pusher.velocity_or_zero() * self.push_transfer;
        let mut accelerated = false;
        if let Some(v) = pushed.velocity.as_mut() {
            *v += transfer;
            accelerated = transfer != Vec2::ZERO;
        }
        moved || accelerated
    }

    /// Reflect each non-static velocity along the centre-to-centre normal.
    ///
    /// A body's own normal component is mirrored and scaled by
    /// `2 × m_other / (m_a + m_b)`; the tangential part is kept. With no mass
    /// on either side the factor is 1. A body at rest stays at rest.
    pub fn bounce(a: &mut BodyState, b: &mut BodyState) -> bool {
        let normal = collision_normal(&a.bounds, &b.bounds);
        let total = a.mass + b.mass;
        let factor = |other_mass: f32| {
            if total > 0.0 {
                2.0 * other_mass / total
            } else {
                1.0
            }
        };
        let factor_a = factor(b.mass);
        let factor_b = factor(a.mass);

        let changed_a = Self::reflect(a, normal, factor_a);
        let changed_b = Self::reflect(b, normal, factor_b);
        changed_a || changed_b
    }

    fn reflect(body: &mut BodyState, normal: Vec2, factor: f32) -> bool {
        if body.flags.is_static {
            return false;
        }
        let Some(v) = body.velocity.as_mut() else {
            return false;
        };
        let along = v.dot(normal);
        // normal component goes from `along` to `-factor × along`
        let delta = normal * (along * (1.0 + factor));
        *v -= delta;
        delta != Vec2::ZERO
    }

    /// Project `mover`'s velocity onto the surface of `other`, keeping only
    /// the tangential part.
    pub fn slide(mover: &mut BodyState, other: &mut BodyState) -> bool {
        if mover.flags.is_static {
            return false;
        }
        let normal = collision_normal(&mover.bounds, &other.bounds);
        let Some(v) = mover.velocity.as_mut() else {
            return false;
        };
        let along = v.dot(normal);
        *v -= normal * along;
        along != 0.0
    }
}

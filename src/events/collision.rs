//! Collision event payloads carried by the [`EventBus`](super::bus::EventBus).
//!
//! The collision pipeline publishes one event per overlapping pair per frame:
//! a [`TriggerEvent`] if either side is a trigger volume, a
//! [`CollisionEvent`] otherwise. Pairs that stop overlapping produce a final
//! event with [`ContactKind::Exit`]. Tile hits are reported separately as
//! [`TileCollisionEvent`].
//!
//! Subscribe to [`PhysicsTopic::Contact`] to see both entity-entity kinds, or
//! to [`PhysicsTopic::Any`] to see everything.
//!
//! Handles in EXIT events may refer to entities that no longer exist.

use super::bus::{BusEvent, EventBus};
use crate::collision::Handle;

/// Phase of a contact between two colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// First frame the pair overlaps.
    Enter,
    /// The pair overlapped in the previous frame too.
    Stay,
    /// The pair overlapped last frame but not this one.
    Exit,
}

/// Two solid (or at least non-trigger) colliders overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent<H> {
    pub entity_a: H,
    pub entity_b: H,
    pub kind: ContactKind,
}

impl<H: Handle> CollisionEvent<H> {
    /// `true` if `entity` is one of the participants.
    pub fn involves(&self, entity: H) -> bool {
        self.entity_a == entity || self.entity_b == entity
    }

    /// The participant that is not `entity`.
    pub fn other(&self, entity: H) -> Option<H> {
        if self.entity_a == entity {
            Some(self.entity_b)
        } else if self.entity_b == entity {
            Some(self.entity_a)
        } else {
            None
        }
    }
}

/// A collider overlapping a trigger volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent<H> {
    pub trigger_entity: H,
    pub other_entity: H,
    pub kind: ContactKind,
}

/// An entity blocked by the tile map on one or both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCollisionEvent<H> {
    pub entity: H,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

/// Subscription topics for [`PhysicsEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicsTopic {
    /// Every physics event.
    Any,
    /// Entity-entity contacts, both collisions and triggers.
    Contact,
    Collision,
    Trigger,
    TileCollision,
}

/// Everything the collision pipeline publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsEvent<H> {
    Collision(CollisionEvent<H>),
    Trigger(TriggerEvent<H>),
    TileCollision(TileCollisionEvent<H>),
}

impl<H> PhysicsEvent<H> {
    pub fn as_collision(&self) -> Option<&CollisionEvent<H>> {
        match self {
            PhysicsEvent::Collision(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_trigger(&self) -> Option<&TriggerEvent<H>> {
        match self {
            PhysicsEvent::Trigger(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_tile_collision(&self) -> Option<&TileCollisionEvent<H>> {
        match self {
            PhysicsEvent::TileCollision(event) => Some(event),
            _ => None,
        }
    }

    /// Contact phase, `None` for tile collisions.
    pub fn kind(&self) -> Option<ContactKind> {
        match self {
            PhysicsEvent::Collision(event) => Some(event.kind),
            PhysicsEvent::Trigger(event) => Some(event.kind),
            PhysicsEvent::TileCollision(_) => None,
        }
    }
}

impl<H: Handle> BusEvent for PhysicsEvent<H> {
    type Topic = PhysicsTopic;

    fn topic(&self) -> PhysicsTopic {
        match self {
            PhysicsEvent::Collision(_) => PhysicsTopic::Collision,
            PhysicsEvent::Trigger(_) => PhysicsTopic::Trigger,
            PhysicsEvent::TileCollision(_) => PhysicsTopic::TileCollision,
        }
    }

    fn supertopics(&self) -> &'static [PhysicsTopic] {
        match self {
            PhysicsEvent::Collision(_) | PhysicsEvent::Trigger(_) => {
                &[PhysicsTopic::Contact, PhysicsTopic::Any]
            }
            PhysicsEvent::TileCollision(_) => &[PhysicsTopic::Any],
        }
    }
}

/// Bus carrying the collision pipeline's output.
pub type PhysicsBus<H> = EventBus<PhysicsEvent<H>>;

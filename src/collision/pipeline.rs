//! Per-frame collision pipeline.
//!
//! One [`CollisionPipeline::update`] call runs a whole frame:
//!
//! 1. read the collidable handles and a [`ColliderInfo`] snapshot of each
//!    from the [`CollisionWorld`], skipping handles without usable bounds;
//! 2. rebuild the quadtree;
//! 3. collect each unordered candidate pair once;
//! 4. drop pairs rejected by the [`LayerMatrix`], confirm the rest with
//!    [`aabb_overlap`];
//! 5. classify each contact as ENTER or STAY against the contact table;
//! 6. resolve solid, non-trigger pairs with the [`ResponseResolver`] and
//!    write changed positions and velocities back to the world;
//! 7. publish one event per contact, then EXIT events for pairs that
//!    separated;
//! 8. run the optional tile pass;
//! 9. store the [`FrameStats`].
//!
//! Only a failure to list the collidables aborts a frame. Everything else
//! (missing colliders, bad bounds, rejected writes) is logged and skipped.

use std::time::{Duration, Instant};

use bevy_ecs::prelude::Resource;
use glam::Vec2;
use log::{debug, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use super::Handle;
use super::body::ColliderInfo;
use super::contacts::ContactTracker;
use super::layers::{CollisionLayer, LayerMatrix};
use super::narrowphase::aabb_overlap;
use super::quadtree::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_OBJECTS, Quadtree};
use super::rect::Rect;
use super::response::{BodyState, ResponseResolver, ResponseType, DEFAULT_PUSH_TRANSFER};
use super::tiles::{TileCollisionProvider, resolve_tile_motion};
use crate::events::bus::GameEvent;
use crate::events::collision::{
    CollisionEvent, ContactKind, PhysicsBus, PhysicsEvent, TileCollisionEvent, TriggerEvent,
};

/// Source tag on entity contact events.
pub const CONTACT_EVENT_SOURCE: &str = "collision";
/// Source tag on tile collision events.
pub const TILE_EVENT_SOURCE: &str = "tiles";

/// Default world area covered by the quadtree root.
pub const DEFAULT_WORLD_BOUNDS: Rect = Rect::new(0.0, 0.0, 3200.0, 2400.0);

/// Access to the entities the pipeline works on.
///
/// Getters return `None` when a handle lacks the capability; the pipeline
/// then leaves that part of the body alone.
pub trait CollisionWorld {
    type Handle: Handle;

    /// Every handle with a collision capability this frame.
    ///
    /// An error here aborts [`CollisionPipeline::update`].
    fn collidables(&mut self) -> Result<Vec<Self::Handle>, String>;

    /// Bounds, layer, flags and mass of `handle`.
    fn collider(&self, handle: Self::Handle) -> Option<ColliderInfo>;

    fn position(&self, handle: Self::Handle) -> Option<Vec2>;

    fn set_position(&mut self, handle: Self::Handle, position: Vec2) -> Result<(), String>;

    fn velocity(&self, handle: Self::Handle) -> Option<Vec2>;

    fn set_velocity(&mut self, handle: Self::Handle, velocity: Vec2) -> Result<(), String>;
}

/// Tunables fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Area covered by the quadtree root. Entities outside still collide,
    /// they just stay at the root node.
    pub world_bounds: Rect,
    pub max_objects: usize,
    pub max_depth: usize,
    /// Use the quadtree for the broad phase. When `false`, every pair is a
    /// candidate.
    pub spatial_partitioning: bool,
    /// Run the tile pass when a provider is set.
    pub tile_collisions: bool,
    pub push_transfer: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            world_bounds: DEFAULT_WORLD_BOUNDS,
            max_objects: DEFAULT_MAX_OBJECTS,
            max_depth: DEFAULT_MAX_DEPTH,
            spatial_partitioning: true,
            tile_collisions: true,
            push_transfer: DEFAULT_PUSH_TRANSFER,
        }
    }
}

/// Statistics of the last [`CollisionPipeline::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Handles returned by the world, skipped ones included.
    pub total_entities: usize,
    /// Overlapping pairs that passed the layer filter.
    pub entity_collisions: usize,
    /// Entities blocked by the tile map.
    pub tile_collisions: usize,
    /// Pairs produced by the broad phase.
    pub candidate_pairs: usize,
    /// Handles ignored for lack of a collider or valid bounds.
    pub skipped: usize,
    /// Pairs that stopped touching this frame.
    pub exits: usize,
    pub processing_time: Duration,
}

/// Tile map shared with the pipeline.
pub type SharedTileProvider = Box<dyn TileCollisionProvider + Send + Sync>;

/// Owns every piece of collision state that survives between frames.
#[derive(Resource)]
pub struct CollisionPipeline<H: Handle> {
    settings: PipelineSettings,
    layers: LayerMatrix,
    resolver: ResponseResolver,
    index: Quadtree<H>,
    contacts: ContactTracker<H>,
    tiles: Option<SharedTileProvider>,
    stats: FrameStats,
    bodies: FxHashMap<H, ColliderInfo>,
}

impl<H: Handle> Default for CollisionPipeline<H> {
    fn default() -> Self {
        Self::new(PipelineSettings::default())
    }
}

impl<H: Handle> CollisionPipeline<H> {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            layers: LayerMatrix::new(),
            resolver: ResponseResolver::with_push_transfer(settings.push_transfer),
            index: Quadtree::with_limits(
                settings.world_bounds,
                settings.max_objects,
                settings.max_depth,
            ),
            contacts: ContactTracker::new(),
            tiles: None,
            stats: FrameStats::default(),
            bodies: FxHashMap::default(),
            settings,
        }
    }

    pub fn with_layers(mut self, layers: LayerMatrix) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_tile_provider(mut self, provider: SharedTileProvider) -> Self {
        self.tiles = Some(provider);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn layers(&self) -> &LayerMatrix {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerMatrix {
        &mut self.layers
    }

    /// Allow or forbid collisions between two layers, both directions.
    pub fn set_layer_rule(&mut self, a: CollisionLayer, b: CollisionLayer, allowed: bool) {
        self.layers.set_rule(a, b, allowed);
    }

    pub fn resolver(&self) -> &ResponseResolver {
        &self.resolver
    }

    pub fn set_tile_provider(&mut self, provider: Option<SharedTileProvider>) {
        self.tiles = provider;
    }

    pub fn has_tile_provider(&self) -> bool {
        self.tiles.is_some()
    }

    /// Statistics of the most recent frame.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Quadtree as built by the most recent frame.
    pub fn index(&self) -> &Quadtree<H> {
        &self.index
    }

    /// `true` if `a` and `b` were touching in the most recent frame.
    pub fn are_touching(&self, a: H, b: H) -> bool {
        self.contacts.is_touching(a, b)
    }

    /// Forget all contacts without emitting EXIT events.
    pub fn reset_contacts(&mut self) {
        self.contacts.clear();
    }

    /// Run one frame. `dt` is only used for the tile look-ahead.
    pub fn update<W>(
        &mut self,
        world: &mut W,
        bus: &mut PhysicsBus<H>,
        dt: f32,
    ) -> Result<FrameStats, String>
    where
        W: CollisionWorld<Handle = H> + ?Sized,
    {
        let started = Instant::now();
        let handles = world.collidables()?;
        let mut stats = FrameStats {
            total_entities: handles.len(),
            ..FrameStats::default()
        };
        self.contacts.begin_frame();

        let order = self.snapshot(world, handles, &mut stats);
        self.rebuild_index(&order);

        let pairs = self.candidate_pairs(&order);
        stats.candidate_pairs = pairs.len();

        for (a, b) in pairs {
            if self.handle_pair(world, bus, a, b) {
                stats.entity_collisions += 1;
            }
        }

        for ended in self.contacts.end_frame() {
            stats.exits += 1;
            let payload = match ended.trigger {
                Some(trigger) => PhysicsEvent::Trigger(TriggerEvent {
                    trigger_entity: trigger,
                    other_entity: if trigger == ended.a { ended.b } else { ended.a },
                    kind: ContactKind::Exit,
                }),
                None => PhysicsEvent::Collision(CollisionEvent {
                    entity_a: ended.a,
                    entity_b: ended.b,
                    kind: ContactKind::Exit,
                }),
            };
            bus.publish(GameEvent::new(payload).with_source(CONTACT_EVENT_SOURCE));
        }

        if self.settings.tile_collisions {
            stats.tile_collisions = self.tile_pass(world, bus, &order, dt);
        }

        stats.processing_time = started.elapsed();
        self.stats = stats;
        debug!(
            target: "collision",
            "Frame: {} entities, {} candidates, {} collisions, {} tile hits, {} skipped",
            stats.total_entities,
            stats.candidate_pairs,
            stats.entity_collisions,
            stats.tile_collisions,
            stats.skipped
        );
        Ok(stats)
    }

    /// Read each handle's collider once. Returns the usable handles in world
    /// order, duplicates removed.
    fn snapshot<W>(&mut self, world: &W, handles: Vec<H>, stats: &mut FrameStats) -> Vec<H>
    where
        W: CollisionWorld<Handle = H> + ?Sized,
    {
        self.bodies.clear();
        let mut order = Vec::with_capacity(handles.len());
        for handle in handles {
            let Some(info) = world.collider(handle) else {
                debug!(target: "collision", "Skipping {:?}: no collider", handle);
                stats.skipped += 1;
                continue;
            };
            if !info.bounds.is_valid() {
                warn!(
                    target: "collision",
                    "Skipping {:?}: invalid bounds {:?}", handle, info.bounds
                );
                stats.skipped += 1;
                continue;
            }
            if self.bodies.insert(handle, info).is_none() {
                order.push(handle);
            }
        }
        order
    }

    fn rebuild_index(&mut self, order: &[H]) {
        self.index.clear();
        if !self.settings.spatial_partitioning {
            return;
        }
        for &handle in order {
            if let Some(info) = self.bodies.get(&handle) {
                self.index.insert(handle, info.bounds);
            }
        }
    }

    /// Unique unordered pairs, each reported once as `(earlier, later)` in
    /// world order.
    fn candidate_pairs(&self, order: &[H]) -> Vec<(H, H)> {
        let mut pairs = Vec::new();
        if !self.settings.spatial_partitioning {
            for (i, &a) in order.iter().enumerate() {
                for &b in &order[i + 1..] {
                    pairs.push((a, b));
                }
            }
            return pairs;
        }

        let mut processed: FxHashSet<H> = FxHashSet::default();
        let mut found: Vec<H> = Vec::new();
        for &a in order {
            processed.insert(a);
            let Some(info) = self.bodies.get(&a) else {
                continue;
            };
            found.clear();
            self.index.query_into(&info.bounds, &mut found);
            for &b in &found {
                if !processed.contains(&b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Filter, classify, resolve and publish one candidate pair. Returns
    /// `true` if the pair is a real collision.
    fn handle_pair<W>(&mut self, world: &mut W, bus: &mut PhysicsBus<H>, a: H, b: H) -> bool
    where
        W: CollisionWorld<Handle = H> + ?Sized,
    {
        let (Some(&info_a), Some(&info_b)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
            return false;
        };
        if !self.layers.pair_allowed(info_a.layer, info_b.layer) {
            return false;
        }
        if !aabb_overlap(&info_a.bounds, &info_b.bounds) {
            return false;
        }

        let trigger = if info_a.flags.trigger {
            Some(a)
        } else if info_b.flags.trigger {
            Some(b)
        } else {
            None
        };
        let kind = self.contacts.record(a, b, trigger);
        trace!(target: "collision", "{:?} / {:?}: {:?}", a, b, kind);

        let physical = info_a.flags.solid
            && info_b.flags.solid
            && !info_a.flags.trigger
            && !info_b.flags.trigger;
        if physical {
            let response = info_a
                .response
                .or(info_b.response)
                .unwrap_or_else(|| ResponseResolver::classify(&info_a.flags, &info_b.flags));
            self.resolve_pair(world, (a, info_a), (b, info_b), response);
        }

        let payload = match trigger {
            Some(trigger) => PhysicsEvent::Trigger(TriggerEvent {
                trigger_entity: trigger,
                other_entity: if trigger == a { b } else { a },
                kind,
            }),
            None => PhysicsEvent::Collision(CollisionEvent {
                entity_a: a,
                entity_b: b,
                kind,
            }),
        };
        bus.publish(GameEvent::new(payload).with_source(CONTACT_EVENT_SOURCE));
        true
    }

    fn resolve_pair<W>(
        &mut self,
        world: &mut W,
        (a, info_a): (H, ColliderInfo),
        (b, info_b): (H, ColliderInfo),
        response: ResponseType,
    ) where
        W: CollisionWorld<Handle = H> + ?Sized,
    {
        let load = |handle: H, info: &ColliderInfo| BodyState {
            bounds: info.bounds,
            flags: info.flags,
            mass: info.mass,
            position: world.position(handle),
            velocity: world.velocity(handle),
        };
        let before_a = load(a, &info_a);
        let before_b = load(b, &info_b);
        let (mut state_a, mut state_b) = (before_a, before_b);

        let changed = match response {
            ResponseType::Push => {
                self.resolver.push(&mut state_a, &mut state_b)
                    || ResponseResolver::separate(&mut state_a, &mut state_b)
            }
            other => self.resolver.resolve(other, &mut state_a, &mut state_b),
        };
        if !changed {
            return;
        }

        self.write_back(world, a, &before_a, &state_a);
        self.write_back(world, b, &before_b, &state_b);
    }

    fn write_back<W>(&mut self, world: &mut W, handle: H, before: &BodyState, after: &BodyState)
    where
        W: CollisionWorld<Handle = H> + ?Sized,
    {
        if after.position != before.position {
            if let Some(position) = after.position {
                match world.set_position(handle, position) {
                    Ok(()) => {
                        if let Some(info) = self.bodies.get_mut(&handle) {
                            info.bounds = after.bounds;
                        }
                    }
                    Err(e) => {
                        warn!(target: "collision", "Could not move {:?}: {}", handle, e)
                    }
                }
            }
        }
        if after.velocity != before.velocity {
            if let Some(velocity) = after.velocity {
                if let Err(e) = world.set_velocity(handle, velocity) {
                    warn!(target: "collision", "Could not set velocity of {:?}: {}", handle, e);
                }
            }
        }
    }

    /// Block moving, non-static bodies against the tile map. Returns the
    /// number of blocked bodies.
    fn tile_pass<W>(
        &self,
        world: &mut W,
        bus: &mut PhysicsBus<H>,
        order: &[H],
        dt: f32,
    ) -> usize
    where
        W: CollisionWorld<Handle = H> + ?Sized,
    {
        let Some(tiles) = self.tiles.as_deref() else {
            return 0;
        };
        let mut blocked = 0;
        for &handle in order {
            let Some(info) = self.bodies.get(&handle) else {
                continue;
            };
            if info.flags.is_static || info.flags.trigger {
                continue;
            }
            let Some(velocity) = world.velocity(handle) else {
                continue;
            };
            if velocity == Vec2::ZERO {
                continue;
            }
            let motion = resolve_tile_motion(tiles, &info.bounds, velocity * dt);
            if !motion.blocked() {
                continue;
            }
            blocked += 1;
            let corrected = Vec2::new(
                if motion.blocked_x { 0.0 } else { velocity.x },
                if motion.blocked_y { 0.0 } else { velocity.y },
            );
            if let Err(e) = world.set_velocity(handle, corrected) {
                warn!(target: "collision", "Could not stop {:?} at tiles: {}", handle, e);
            }
            bus.publish(
                GameEvent::new(PhysicsEvent::TileCollision(TileCollisionEvent {
                    entity: handle,
                    blocked_x: motion.blocked_x,
                    blocked_y: motion.blocked_y,
                }))
                .with_source(TILE_EVENT_SOURCE),
            );
        }
        blocked
    }
}

//! Headless demo scene.
//!
//! Builds a walled arena with a player, wandering enemies, pushable crates,
//! bouncing projectiles, pickups and trigger zones, wires a few listeners to
//! the physics bus and runs the frame schedule. Used by the binary and by
//! the ECS integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::*;
use glam::Vec2;
use log::{debug, info};
use serde::Serialize;

use crate::collision::{BodyFlags, CollisionLayer, CollisionPipeline, Rect, ResponseType};
use crate::components::boxcollider::BoxCollider;
use crate::components::group::Group;
use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::events::collision::{ContactKind, PhysicsEvent, PhysicsTopic};
use crate::resources::collisionconfig::CollisionConfig;
use crate::resources::tilemap::TileCollisionMap;
use crate::resources::worldtime::WorldTime;
use crate::systems::collision::{EntityPhysicsBus, collision_system, setup_collision};
use crate::systems::events::process_events_system;
use crate::systems::movement::movement_system;
use crate::systems::time::update_world_time;

const WALL_THICKNESS: f32 = 32.0;
const PLAYER_SIZE: f32 = 32.0;
const ENEMY_SIZE: f32 = 24.0;
const CRATE_SIZE: f32 = 28.0;
const PICKUP_SIZE: f32 = 12.0;
const PROJECTILE_SIZE: f32 = 6.0;
const ZONE_SIZE: f32 = 96.0;
const PROJECTILE_MASS: f32 = 1.0;

/// What to put in the arena.
#[derive(Debug, Clone, Copy)]
pub struct ArenaOptions {
    /// Arena area; walls are placed just inside it.
    pub bounds: Rect,
    /// Number of enemies. Crates, pickups and projectiles scale with it.
    pub entities: usize,
    pub seed: u64,
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, 1280.0, 720.0),
            entities: 40,
            seed: 0x00ab_e44e,
        }
    }
}

/// Entities spawned by [`spawn_arena`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArenaSummary {
    pub walls: usize,
    pub enemies: usize,
    pub crates: usize,
    pub pickups: usize,
    pub projectiles: usize,
    pub zones: usize,
}

impl ArenaSummary {
    pub fn total(&self) -> usize {
        1 + self.walls + self.enemies + self.crates + self.pickups + self.projectiles + self.zones
    }
}

fn random_point(rng: &mut fastrand::Rng, inner: &Rect, size: f32) -> Vec2 {
    Vec2::new(
        inner.x + rng.f32() * (inner.w - size).max(0.0),
        inner.y + rng.f32() * (inner.h - size).max(0.0),
    )
}

fn random_velocity(rng: &mut fastrand::Rng, speed: f32) -> Vec2 {
    let angle = rng.f32() * std::f32::consts::TAU;
    Vec2::from_angle(angle) * speed
}

fn spawn_wall(world: &mut World, rect: Rect) {
    world.spawn((
        Group("wall"),
        MapPosition::new(rect.x, rect.y),
        BoxCollider::new(rect.w, rect.h)
            .with_layer(CollisionLayer::WALL)
            .fixed()
            // bounce factors use the wall's mass; match the projectiles
            .with_mass(PROJECTILE_MASS),
    ));
}

/// Populate `world` with the demo arena. Returns the player entity and a
/// count of everything else.
pub fn spawn_arena(world: &mut World, options: &ArenaOptions) -> (Entity, ArenaSummary) {
    let mut rng = fastrand::Rng::with_seed(options.seed);
    let b = options.bounds;
    let t = WALL_THICKNESS;
    let mut summary = ArenaSummary::default();

    for rect in [
        Rect::new(b.x, b.y, b.w, t),
        Rect::new(b.x, b.bottom() - t, b.w, t),
        Rect::new(b.x, b.y + t, t, b.h - 2.0 * t),
        Rect::new(b.right() - t, b.y + t, t, b.h - 2.0 * t),
    ] {
        spawn_wall(world, rect);
        summary.walls += 1;
    }

    let inner = Rect::new(b.x + t, b.y + t, b.w - 2.0 * t, b.h - 2.0 * t);

    let player_flags = BodyFlags {
        can_push: true,
        can_be_pushed: false,
        ..BodyFlags::default()
    };
    let player = world
        .spawn((
            Group("player"),
            MapPosition::from_vec(inner.center() - Vec2::splat(PLAYER_SIZE / 2.0)),
            RigidBody::with_velocity(Vec2::new(120.0, 40.0)),
            BoxCollider::new(PLAYER_SIZE, PLAYER_SIZE)
                .with_layer(CollisionLayer::PLAYER)
                .with_flags(player_flags),
        ))
        .id();

    for _ in 0..options.entities {
        let speed = 60.0 + rng.f32() * 60.0;
        world.spawn((
            Group("enemy"),
            MapPosition::from_vec(random_point(&mut rng, &inner, ENEMY_SIZE)),
            RigidBody::with_velocity(random_velocity(&mut rng, speed)),
            BoxCollider::new(ENEMY_SIZE, ENEMY_SIZE)
                .with_layer(CollisionLayer::ENEMY)
                .with_mass(1.0 + rng.f32() * 2.0),
        ));
        summary.enemies += 1;
    }

    for _ in 0..(options.entities / 4).max(1) {
        world.spawn((
            Group("crate"),
            MapPosition::from_vec(random_point(&mut rng, &inner, CRATE_SIZE)),
            RigidBody::with_physics(4.0, Some(200.0)),
            BoxCollider::new(CRATE_SIZE, CRATE_SIZE)
                .with_layer(CollisionLayer::ENVIRONMENT)
                .with_mass(4.0),
        ));
        summary.crates += 1;
    }

    for _ in 0..(options.entities / 2).max(1) {
        world.spawn((
            Group("pickup"),
            MapPosition::from_vec(random_point(&mut rng, &inner, PICKUP_SIZE)),
            BoxCollider::new(PICKUP_SIZE, PICKUP_SIZE)
                .with_layer(CollisionLayer::PICKUP)
                .sensor(),
        ));
        summary.pickups += 1;
    }

    for _ in 0..(options.entities / 8).max(1) {
        world.spawn((
            Group("projectile"),
            MapPosition::from_vec(random_point(&mut rng, &inner, PROJECTILE_SIZE)),
            RigidBody::with_velocity(random_velocity(&mut rng, 240.0)),
            BoxCollider::new(PROJECTILE_SIZE, PROJECTILE_SIZE)
                .with_layer(CollisionLayer::PROJECTILE)
                .with_mass(PROJECTILE_MASS)
                .with_response(ResponseType::Bounce),
        ));
        summary.projectiles += 1;
    }

    for _ in 0..2 {
        world.spawn((
            Group("zone"),
            MapPosition::from_vec(random_point(&mut rng, &inner, ZONE_SIZE)),
            BoxCollider::new(ZONE_SIZE, ZONE_SIZE)
                .with_layer(CollisionLayer::TRIGGER)
                .sensor(),
        ));
        summary.zones += 1;
    }

    info!(
        "Arena spawned: {} entities ({} enemies, {} crates, {} pickups, {} projectiles)",
        summary.total(),
        summary.enemies,
        summary.crates,
        summary.pickups,
        summary.projectiles
    );
    (player, summary)
}

/// Running totals collected by the demo listeners.
#[derive(Debug, Default)]
pub struct ContactTally {
    pub enters: AtomicU64,
    pub stays: AtomicU64,
    pub exits: AtomicU64,
    pub triggers: AtomicU64,
    pub tile_hits: AtomicU64,
}

/// Plain copy of a [`ContactTally`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContactTotals {
    pub enters: u64,
    pub stays: u64,
    pub exits: u64,
    pub triggers: u64,
    pub tile_hits: u64,
}

impl ContactTally {
    pub fn totals(&self) -> ContactTotals {
        ContactTotals {
            enters: self.enters.load(Ordering::Relaxed),
            stays: self.stays.load(Ordering::Relaxed),
            exits: self.exits.load(Ordering::Relaxed),
            triggers: self.triggers.load(Ordering::Relaxed),
            tile_hits: self.tile_hits.load(Ordering::Relaxed),
        }
    }
}

/// Demo listener state shared with the ECS.
#[derive(Resource, Clone, Default)]
pub struct DemoListeners {
    pub tally: Arc<ContactTally>,
    /// Pickups touched by the player, despawned by [`collect_pickups_system`].
    pub collected: Arc<Mutex<Vec<Entity>>>,
}

/// Subscribe the demo listeners. `pickups` lists the entities a trigger
/// ENTER should collect.
pub fn register_listeners(world: &mut World) -> DemoListeners {
    let listeners = DemoListeners::default();
    let pickups: Vec<Entity> = {
        let mut query = world.query::<(Entity, &Group)>();
        query
            .iter(world)
            .filter(|(_, g)| g.name() == "pickup")
            .map(|(e, _)| e)
            .collect()
    };

    let mut bus = world.resource_mut::<EntityPhysicsBus>();

    let tally = listeners.tally.clone();
    bus.subscribe(PhysicsTopic::Any, move |event| {
        let counter = match event.payload() {
            PhysicsEvent::TileCollision(_) => &tally.tile_hits,
            other => match other.kind() {
                Some(ContactKind::Enter) => &tally.enters,
                Some(ContactKind::Stay) => &tally.stays,
                _ => &tally.exits,
            },
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    });

    let tally = listeners.tally.clone();
    let collected = listeners.collected.clone();
    bus.subscribe(PhysicsTopic::Trigger, move |event| {
        let Some(trigger) = event.payload().as_trigger() else {
            return Ok(());
        };
        tally.triggers.fetch_add(1, Ordering::Relaxed);
        if trigger.kind == ContactKind::Enter && pickups.contains(&trigger.trigger_entity) {
            collected
                .lock()
                .map_err(|_| "pickup list poisoned".to_string())?
                .push(trigger.trigger_entity);
            // nobody else needs to see a collected pickup
            event.consume();
        }
        Ok(())
    });

    world.insert_resource(listeners.clone());
    listeners
}

/// Despawn pickups collected by the trigger listener.
pub fn collect_pickups_system(mut commands: Commands, listeners: Res<DemoListeners>) {
    let Ok(mut collected) = listeners.collected.lock() else {
        return;
    };
    for entity in collected.drain(..) {
        if let Ok(mut e) = commands.get_entity(entity) {
            debug!("Pickup {:?} collected", entity);
            e.despawn();
        }
    }
}

/// Per-frame schedule: move, collide, dispatch events, apply gameplay.
pub fn build_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(
        (
            movement_system,
            collision_system,
            process_events_system,
            collect_pickups_system,
        )
            .chain(),
    );
    update
}

/// Advance the clock and run one frame.
pub fn step(world: &mut World, schedule: &mut Schedule, dt: f32) {
    update_world_time(world, dt);
    schedule.run(world);
}

/// Number of entities in `world` still carrying `group`.
pub fn count_group(world: &mut World, group: &str) -> usize {
    let mut query = world.query::<&Group>();
    query.iter(world).filter(|g| g.name() == group).count()
}

/// Insert a fresh [`WorldTime`] if none exists.
pub fn ensure_world_time(world: &mut World) {
    if !world.contains_resource::<WorldTime>() {
        world.insert_resource(WorldTime::default());
    }
}

/// Everything the demo needs: collision resources, layer tweaks, arena and
/// listeners.
pub fn setup_demo(
    world: &mut World,
    config: &CollisionConfig,
    tiles: Option<TileCollisionMap>,
    options: &ArenaOptions,
) -> (Entity, ArenaSummary, DemoListeners) {
    ensure_world_time(world);
    setup_collision(world, config, tiles);
    {
        let mut pipeline = world.resource_mut::<CollisionPipeline<Entity>>();
        // crates stay inside the arena
        pipeline.set_layer_rule(CollisionLayer::ENVIRONMENT, CollisionLayer::WALL, true);
    }
    let (player, summary) = spawn_arena(world, options);
    let listeners = register_listeners(world);
    (player, summary, listeners)
}

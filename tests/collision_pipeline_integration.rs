//! Collision Pipeline Integration Tests
//!
//! Drives [`CollisionPipeline`] against an in-memory world, without bevy, to
//! check frame-level behaviour end to end.
//!
//! # Test Categories
//!
//! 1. **Scenario** - player against a static wall
//! 2. **Contacts** - ENTER, STAY and EXIT across frames
//! 3. **Triggers** - trigger events and no physical response
//! 4. **Responses** - push, preferred bounce, mass-weighted separation
//! 5. **Failures** - world errors, rejected writes, missing capabilities
//! 6. **Tiles** - tile pass blocking and events
//!
//! # Usage
//!
//! ```sh
//! cargo test --test collision_pipeline_integration
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use aberredcollision::collision::{
    BodyFlags, ColliderInfo, CollisionLayer, CollisionPipeline, CollisionWorld, PipelineSettings,
    Rect, ResponseType, TileCollisionProvider,
};
use aberredcollision::events::bus::GameEvent;
use aberredcollision::events::collision::{
    CollisionEvent, ContactKind, PhysicsBus, PhysicsEvent, PhysicsTopic, TriggerEvent,
};
use glam::Vec2;

// =============================================================================
// Test World
// =============================================================================

#[derive(Debug, Clone)]
struct Body {
    position: Option<Vec2>,
    velocity: Option<Vec2>,
    size: Vec2,
    layer: CollisionLayer,
    flags: BodyFlags,
    mass: f32,
    response: Option<ResponseType>,
    read_only: bool,
}

impl Body {
    fn new(x: f32, y: f32, w: f32, h: f32, layer: CollisionLayer) -> Self {
        Self {
            position: Some(Vec2::new(x, y)),
            velocity: Some(Vec2::ZERO),
            size: Vec2::new(w, h),
            layer,
            flags: BodyFlags::default(),
            mass: 1.0,
            response: None,
            read_only: false,
        }
    }

    fn flags(mut self, flags: BodyFlags) -> Self {
        self.flags = flags;
        self
    }

    fn mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    fn velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }
}

#[derive(Default)]
struct TestWorld {
    bodies: BTreeMap<u32, Body>,
    fail_listing: bool,
}

impl TestWorld {
    fn add(&mut self, id: u32, body: Body) {
        self.bodies.insert(id, body);
    }

    fn pos(&self, id: u32) -> Vec2 {
        self.bodies[&id].position.unwrap()
    }

    fn vel(&self, id: u32) -> Vec2 {
        self.bodies[&id].velocity.unwrap()
    }

    fn move_to(&mut self, id: u32, x: f32, y: f32) {
        self.bodies.get_mut(&id).unwrap().position = Some(Vec2::new(x, y));
    }
}

impl CollisionWorld for TestWorld {
    type Handle = u32;

    fn collidables(&mut self) -> Result<Vec<u32>, String> {
        if self.fail_listing {
            return Err("entity store unavailable".to_string());
        }
        Ok(self.bodies.keys().copied().collect())
    }

    fn collider(&self, handle: u32) -> Option<ColliderInfo> {
        let body = self.bodies.get(&handle)?;
        let position = body.position?;
        let info = ColliderInfo::new(
            Rect::new(position.x, position.y, body.size.x, body.size.y),
            body.layer,
        )
        .with_flags(body.flags)
        .with_mass(body.mass);
        Some(match body.response {
            Some(response) => info.with_response(response),
            None => info,
        })
    }

    fn position(&self, handle: u32) -> Option<Vec2> {
        self.bodies.get(&handle)?.position
    }

    fn set_position(&mut self, handle: u32, position: Vec2) -> Result<(), String> {
        let body = self.bodies.get_mut(&handle).ok_or("no such body")?;
        if body.read_only {
            return Err("read only".to_string());
        }
        body.position = Some(position);
        Ok(())
    }

    fn velocity(&self, handle: u32) -> Option<Vec2> {
        self.bodies.get(&handle)?.velocity
    }

    fn set_velocity(&mut self, handle: u32, velocity: Vec2) -> Result<(), String> {
        let body = self.bodies.get_mut(&handle).ok_or("no such body")?;
        if body.read_only {
            return Err("read only".to_string());
        }
        body.velocity = Some(velocity);
        Ok(())
    }
}

type Recorded = Arc<Mutex<Vec<PhysicsEvent<u32>>>>;

fn recording_bus() -> (PhysicsBus<u32>, Recorded) {
    let mut bus = PhysicsBus::new();
    let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe(PhysicsTopic::Any, move |event: &mut GameEvent<PhysicsEvent<u32>>| {
        sink.lock().unwrap().push(*event.payload());
        Ok(())
    });
    (bus, seen)
}

fn drain(bus: &mut PhysicsBus<u32>, seen: &Recorded) -> Vec<PhysicsEvent<u32>> {
    bus.process_events();
    std::mem::take(&mut *seen.lock().unwrap())
}

fn pipeline() -> CollisionPipeline<u32> {
    CollisionPipeline::new(PipelineSettings {
        world_bounds: Rect::new(0.0, 0.0, 1024.0, 1024.0),
        ..PipelineSettings::default()
    })
}

// =============================================================================
// Scenario
// =============================================================================

#[test]
fn player_is_pushed_out_of_static_wall() {
    let mut world = TestWorld::default();
    world.add(1, Body::new(0.0, 0.0, 32.0, 32.0, CollisionLayer::PLAYER));
    world.add(
        2,
        Body::new(16.0, 0.0, 32.0, 32.0, CollisionLayer::WALL)
            .flags(BodyFlags::fixed())
            .mass(0.0),
    );
    let mut pipeline = pipeline();
    let (mut bus, seen) = recording_bus();

    let stats = pipeline.update(&mut world, &mut bus, 1.0 / 60.0).unwrap();

    assert_eq!(stats.total_entities, 2);
    assert_eq!(stats.entity_collisions, 1);
    assert_eq!(world.pos(1), Vec2::new(-16.0, 0.0));
    assert_eq!(world.pos(2), Vec2::new(16.0, 0.0));

    let a = Rect::new(world.pos(1).x, 0.0, 32.0, 32.0);
    let b = Rect::new(16.0, 0.0, 32.0, 32.0);
    assert!(!aberredcollision::collision::narrowphase::aabb_overlap(&a, &b));

    let events = drain(&mut bus, &seen);
    assert_eq!(
        events,
        vec![PhysicsEvent::Collision(CollisionEvent {
            entity_a: 1,
            entity_b: 2,
            kind: ContactKind::Enter,
        })]
    );
}

// =============================================================================
// Contacts
// =============================================================================

#[test]
fn enter_then_stay_then_exit() {
    let mut world = TestWorld::default();
    // non-solid bodies are never separated, so the overlap persists
    let ghost = BodyFlags {
        solid: false,
        ..BodyFlags::default()
    };
    world.add(1, Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::PLAYER).flags(ghost));
    world.add(2, Body::new(5.0, 5.0, 10.0, 10.0, CollisionLayer::ENEMY).flags(ghost));
    let mut pipeline = pipeline();
    let (mut bus, seen) = recording_bus();

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();
    let first = drain(&mut bus, &seen);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind(), Some(ContactKind::Enter));

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();
    let second = drain(&mut bus, &seen);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].kind(), Some(ContactKind::Stay));
    assert!(pipeline.are_touching(1, 2));

    world.move_to(2, 100.0, 100.0);
    let stats = pipeline.update(&mut world, &mut bus, 0.0).unwrap();
    assert_eq!(stats.entity_collisions, 0);
    assert_eq!(stats.exits, 1);
    let third = drain(&mut bus, &seen);
    assert_eq!(
        third,
        vec![PhysicsEvent::Collision(CollisionEvent {
            entity_a: 1,
            entity_b: 2,
            kind: ContactKind::Exit,
        })]
    );

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();
    assert!(drain(&mut bus, &seen).is_empty());
}

#[test]
fn despawned_entity_produces_exit() {
    let mut world = TestWorld::default();
    world.add(1, Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::PLAYER));
    world.add(2, Body::new(5.0, 0.0, 10.0, 10.0, CollisionLayer::PICKUP).flags(BodyFlags::sensor()));
    let mut pipeline = pipeline();
    let (mut bus, seen) = recording_bus();

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();
    drain(&mut bus, &seen);

    world.bodies.remove(&2);
    pipeline.update(&mut world, &mut bus, 0.0).unwrap();
    assert_eq!(
        drain(&mut bus, &seen),
        vec![PhysicsEvent::Trigger(TriggerEvent {
            trigger_entity: 2,
            other_entity: 1,
            kind: ContactKind::Exit,
        })]
    );
}

// =============================================================================
// Triggers
// =============================================================================

#[test]
fn trigger_overlap_raises_trigger_event_without_response() {
    let mut world = TestWorld::default();
    world.add(
        1,
        Body::new(0.0, 0.0, 64.0, 64.0, CollisionLayer::TRIGGER).flags(BodyFlags::sensor()),
    );
    world.add(
        2,
        Body::new(10.0, 10.0, 16.0, 16.0, CollisionLayer::PLAYER).velocity(Vec2::new(3.0, 0.0)),
    );
    let mut pipeline = pipeline();
    let (mut bus, seen) = recording_bus();

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();

    assert_eq!(world.pos(2), Vec2::new(10.0, 10.0));
    assert_eq!(world.vel(2), Vec2::new(3.0, 0.0));
    assert_eq!(
        drain(&mut bus, &seen),
        vec![PhysicsEvent::Trigger(TriggerEvent {
            trigger_entity: 1,
            other_entity: 2,
            kind: ContactKind::Enter,
        })]
    );
}

#[test]
fn layer_filtered_pairs_are_silent() {
    let mut world = TestWorld::default();
    world.add(1, Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::PICKUP));
    world.add(2, Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::ENEMY));
    let mut pipeline = pipeline();
    let (mut bus, seen) = recording_bus();

    let stats = pipeline.update(&mut world, &mut bus, 0.0).unwrap();
    assert_eq!(stats.entity_collisions, 0);
    assert_eq!(world.pos(1), Vec2::ZERO);
    assert!(drain(&mut bus, &seen).is_empty());
}

// =============================================================================
// Responses
// =============================================================================

#[test]
fn pusher_moves_pushable_body() {
    let mut world = TestWorld::default();
    let pusher = BodyFlags {
        can_push: true,
        ..BodyFlags::default()
    };
    world.add(
        1,
        Body::new(0.0, 0.0, 20.0, 20.0, CollisionLayer::PLAYER)
            .flags(pusher)
            .velocity(Vec2::new(10.0, 0.0)),
    );
    world.add(2, Body::new(15.0, 0.0, 20.0, 20.0, CollisionLayer::ENEMY));
    let mut pipeline = pipeline();
    let (mut bus, _seen) = recording_bus();

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();

    assert_eq!(world.pos(1), Vec2::ZERO);
    assert_eq!(world.pos(2), Vec2::new(20.0, 0.0));
    assert_eq!(world.vel(2), Vec2::new(5.0, 0.0));
}

#[test]
fn pusher_against_static_falls_back_to_separation() {
    let mut world = TestWorld::default();
    let pusher = BodyFlags {
        can_push: true,
        ..BodyFlags::default()
    };
    world.add(1, Body::new(0.0, 0.0, 20.0, 20.0, CollisionLayer::PLAYER).flags(pusher));
    world.add(
        2,
        Body::new(15.0, 0.0, 20.0, 20.0, CollisionLayer::WALL).flags(BodyFlags::fixed()),
    );
    let mut pipeline = pipeline();
    let (mut bus, _seen) = recording_bus();

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();

    assert_eq!(world.pos(1), Vec2::new(-5.0, 0.0));
    assert_eq!(world.pos(2), Vec2::new(15.0, 0.0));
}

#[test]
fn preferred_bounce_reflects_projectile() {
    let mut world = TestWorld::default();
    let mut projectile = Body::new(0.0, 0.0, 8.0, 8.0, CollisionLayer::PROJECTILE)
        .velocity(Vec2::new(50.0, 0.0));
    projectile.response = Some(ResponseType::Bounce);
    world.add(1, projectile);
    world.add(
        2,
        Body::new(6.0, 0.0, 32.0, 8.0, CollisionLayer::WALL).flags(BodyFlags::fixed()),
    );
    let mut pipeline = pipeline();
    let (mut bus, _seen) = recording_bus();

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();

    assert_eq!(world.vel(1), Vec2::new(-50.0, 0.0));
    // bounce does not move bodies
    assert_eq!(world.pos(1), Vec2::ZERO);
}

#[test]
fn heavier_body_moves_less() {
    let mut world = TestWorld::default();
    world.add(1, Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::PLAYER).mass(1.0));
    world.add(2, Body::new(6.0, 0.0, 10.0, 10.0, CollisionLayer::ENEMY).mass(3.0));
    let mut pipeline = pipeline();
    let (mut bus, _seen) = recording_bus();

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();

    assert!((world.pos(1).x + 3.0).abs() < 1e-5);
    assert!((world.pos(2).x - 7.0).abs() < 1e-5);
}

#[test]
fn separation_is_seen_by_later_pairs() {
    // 1 is pushed left out of 2 and into the zone 3, which only the moved
    // bounds overlap
    let mut world = TestWorld::default();
    world.add(1, Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::PLAYER));
    world.add(
        2,
        Body::new(8.0, 0.0, 10.0, 10.0, CollisionLayer::WALL).flags(BodyFlags::fixed()),
    );
    world.add(
        3,
        Body::new(-11.0, 0.0, 10.0, 10.0, CollisionLayer::TRIGGER).flags(BodyFlags::sensor()),
    );
    let mut pipeline = CollisionPipeline::new(PipelineSettings {
        spatial_partitioning: false,
        ..PipelineSettings::default()
    });
    let (mut bus, seen) = recording_bus();

    pipeline.update(&mut world, &mut bus, 0.0).unwrap();

    assert_eq!(world.pos(1), Vec2::new(-2.0, 0.0));
    let events = drain(&mut bus, &seen);
    // wall contact plus trigger contact after moving into the zone
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], PhysicsEvent::Trigger(_)));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn listing_error_propagates() {
    let mut world = TestWorld {
        fail_listing: true,
        ..TestWorld::default()
    };
    let mut pipeline = pipeline();
    let (mut bus, _seen) = recording_bus();
    let result = pipeline.update(&mut world, &mut bus, 0.0);
    assert_eq!(result, Err("entity store unavailable".to_string()));
}

#[test]
fn rejected_writes_do_not_stop_the_frame() {
    let mut world = TestWorld::default();
    let mut stubborn = Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::PLAYER);
    stubborn.read_only = true;
    world.add(1, stubborn);
    world.add(
        2,
        Body::new(5.0, 0.0, 10.0, 10.0, CollisionLayer::WALL).flags(BodyFlags::fixed()),
    );
    world.add(3, Body::new(100.0, 0.0, 10.0, 10.0, CollisionLayer::PLAYER));
    world.add(
        4,
        Body::new(105.0, 0.0, 10.0, 10.0, CollisionLayer::WALL).flags(BodyFlags::fixed()),
    );
    let mut pipeline = pipeline();
    let (mut bus, seen) = recording_bus();

    let stats = pipeline.update(&mut world, &mut bus, 0.0).unwrap();

    assert_eq!(stats.entity_collisions, 2);
    assert_eq!(world.pos(1), Vec2::ZERO);
    assert_eq!(world.pos(3), Vec2::new(95.0, 0.0));
    assert_eq!(drain(&mut bus, &seen).len(), 2);
}

#[test]
fn bodies_without_capabilities_are_skipped_or_left_alone() {
    let mut world = TestWorld::default();
    let mut no_position = Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::PLAYER);
    no_position.position = None;
    world.add(1, no_position);
    let mut no_velocity = Body::new(0.0, 0.0, 10.0, 10.0, CollisionLayer::ENEMY);
    no_velocity.velocity = None;
    world.add(2, no_velocity);
    world.add(3, Body::new(5.0, 0.0, 10.0, 10.0, CollisionLayer::PLAYER));
    let mut pipeline = pipeline();
    let (mut bus, _seen) = recording_bus();

    let stats = pipeline.update(&mut world, &mut bus, 0.0).unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.entity_collisions, 1);
    assert!(world.bodies[&2].velocity.is_none());
}

// =============================================================================
// Tiles
// =============================================================================

struct Column;

impl TileCollisionProvider for Column {
    fn tile_size(&self) -> f32 {
        32.0
    }
    fn grid_size(&self) -> (u32, u32) {
        (10, 10)
    }
    fn is_tile_collidable_at(&self, tile_x: u32, _tile_y: u32) -> bool {
        tile_x == 5
    }
}

#[test]
fn tile_pass_blocks_axis_and_reports() {
    let mut world = TestWorld::default();
    world.add(
        1,
        Body::new(128.0, 64.0, 32.0, 32.0, CollisionLayer::PLAYER)
            .velocity(Vec2::new(120.0, 30.0)),
    );
    world.add(
        2,
        Body::new(32.0, 32.0, 32.0, 32.0, CollisionLayer::ENEMY).velocity(Vec2::new(10.0, 0.0)),
    );
    let mut pipeline = pipeline().with_tile_provider(Box::new(Column));
    let (mut bus, seen) = recording_bus();

    let stats = pipeline.update(&mut world, &mut bus, 0.5).unwrap();

    assert_eq!(stats.tile_collisions, 1);
    assert_eq!(world.vel(1), Vec2::new(0.0, 30.0));
    assert_eq!(world.vel(2), Vec2::new(10.0, 0.0));
    let events = drain(&mut bus, &seen);
    assert_eq!(events.len(), 1);
    let tile = events[0].as_tile_collision().unwrap();
    assert_eq!(tile.entity, 1);
    assert!(tile.blocked_x);
    assert!(!tile.blocked_y);
}

#[test]
fn tile_pass_can_be_disabled() {
    let mut world = TestWorld::default();
    world.add(
        1,
        Body::new(128.0, 64.0, 32.0, 32.0, CollisionLayer::PLAYER)
            .velocity(Vec2::new(120.0, 0.0)),
    );
    let mut pipeline = CollisionPipeline::new(PipelineSettings {
        tile_collisions: false,
        ..PipelineSettings::default()
    })
    .with_tile_provider(Box::new(Column));
    let (mut bus, _seen) = recording_bus();

    let stats = pipeline.update(&mut world, &mut bus, 0.5).unwrap();
    assert_eq!(stats.tile_collisions, 0);
    assert_eq!(world.vel(1), Vec2::new(120.0, 0.0));
}

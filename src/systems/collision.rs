//! Collision pipeline on top of the bevy `World`.
//!
//! [`EcsCollisionWorld`] exposes entities with a [`BoxCollider`] to the
//! pipeline: bounds come from the collider and [`MapPosition`], velocity from
//! [`RigidBody`]. [`collision_system`] runs one pipeline frame against the
//! [`CollisionPipeline<Entity>`] and [`EntityPhysicsBus`] resources.

use bevy_ecs::prelude::*;
use glam::Vec2;
use log::{error, warn};

use crate::collision::pipeline::SharedTileProvider;
use crate::collision::{ColliderInfo, CollisionPipeline, CollisionWorld};
use crate::components::boxcollider::BoxCollider;
use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::events::collision::PhysicsBus;
use crate::resources::collisionconfig::CollisionConfig;
use crate::resources::tilemap::TileCollisionMap;
use crate::resources::worldtime::WorldTime;

/// Physics bus keyed by ECS entities.
pub type EntityPhysicsBus = PhysicsBus<Entity>;

/// Borrow of the ECS world seen through [`CollisionWorld`].
pub struct EcsCollisionWorld<'w> {
    world: &'w mut World,
}

impl<'w> EcsCollisionWorld<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self { world }
    }
}

impl CollisionWorld for EcsCollisionWorld<'_> {
    type Handle = Entity;

    fn collidables(&mut self) -> Result<Vec<Entity>, String> {
        let mut query = self.world.query_filtered::<Entity, With<BoxCollider>>();
        let mut entities: Vec<Entity> = query.iter(self.world).collect();
        // archetype order changes as components come and go
        entities.sort_unstable();
        Ok(entities)
    }

    fn collider(&self, entity: Entity) -> Option<ColliderInfo> {
        let collider = self.world.get::<BoxCollider>(entity)?;
        let position = self.world.get::<MapPosition>(entity)?;
        Some(collider.collider_info(position.pos))
    }

    fn position(&self, entity: Entity) -> Option<Vec2> {
        self.world.get::<MapPosition>(entity).map(|p| p.pos)
    }

    fn set_position(&mut self, entity: Entity, position: Vec2) -> Result<(), String> {
        let mut map_position = self
            .world
            .get_mut::<MapPosition>(entity)
            .ok_or_else(|| format!("{entity:?} has no MapPosition"))?;
        map_position.pos = position;
        Ok(())
    }

    fn velocity(&self, entity: Entity) -> Option<Vec2> {
        self.world.get::<RigidBody>(entity).map(|rb| rb.velocity)
    }

    fn set_velocity(&mut self, entity: Entity, velocity: Vec2) -> Result<(), String> {
        let mut rigidbody = self
            .world
            .get_mut::<RigidBody>(entity)
            .ok_or_else(|| format!("{entity:?} has no RigidBody"))?;
        rigidbody.velocity = velocity;
        Ok(())
    }
}

/// Insert the collision resources described by `config`.
///
/// The tile map is only attached when tile collisions are enabled.
pub fn setup_collision(world: &mut World, config: &CollisionConfig, tiles: Option<TileCollisionMap>) {
    let mut pipeline: CollisionPipeline<Entity> = CollisionPipeline::new(config.pipeline_settings());
    if config.tile_collisions {
        pipeline.set_tile_provider(tiles.map(|t| Box::new(t) as SharedTileProvider));
    }
    world.insert_resource(pipeline);
    world.insert_resource::<EntityPhysicsBus>(config.event_bus());
    world.insert_resource(config.clone());
}

/// Run one collision frame. Exclusive system.
pub fn collision_system(world: &mut World) {
    if !world.contains_resource::<CollisionPipeline<Entity>>()
        || !world.contains_resource::<EntityPhysicsBus>()
    {
        warn!(
            target: "collision",
            "collision_system: collision resources missing, call setup_collision first"
        );
        return;
    }
    let (dt, now) = world
        .get_resource::<WorldTime>()
        .map_or((0.0, 0.0), |t| (t.delta, f64::from(t.elapsed)));

    world.resource_scope(|world, mut pipeline: Mut<CollisionPipeline<Entity>>| {
        world.resource_scope(|world, mut bus: Mut<EntityPhysicsBus>| {
            bus.set_time(now);
            let mut adapter = EcsCollisionWorld::new(world);
            if let Err(e) = pipeline.update(&mut adapter, &mut *bus, dt) {
                error!(target: "collision", "Collision frame failed: {}", e);
            }
        });
    });
}

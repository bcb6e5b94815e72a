use bevy_ecs::prelude::*;

use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::resources::worldtime::WorldTime;

/// Integrate positions from rigid body velocities. Runs before collision so
/// the pipeline resolves the overlaps this step created.
pub fn movement_system(mut query: Query<(&mut MapPosition, &mut RigidBody)>, time: Res<WorldTime>) {
    for (mut position, mut rigidbody) in query.iter_mut() {
        if rigidbody.frozen {
            continue;
        }
        let velocity = rigidbody.damped_velocity(time.delta);
        if velocity != rigidbody.velocity {
            rigidbody.velocity = velocity;
        }
        position.pos += velocity * time.delta;
    }
}

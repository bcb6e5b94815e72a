//! Event bus pumping.

use bevy_ecs::prelude::*;
use log::trace;

use crate::resources::worldtime::WorldTime;
use crate::systems::collision::EntityPhysicsBus;

/// Sync the bus clock with [`WorldTime`] and dispatch queued physics events.
pub fn process_events_system(mut bus: ResMut<EntityPhysicsBus>, time: Res<WorldTime>) {
    bus.set_time(f64::from(time.elapsed));
    let dispatched = bus.process_events();
    if dispatched > 0 {
        trace!(
            target: "eventbus",
            "Dispatched {} physics events, {} still queued",
            dispatched,
            bus.queued_len()
        );
    }
}

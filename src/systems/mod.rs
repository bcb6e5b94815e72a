//! Engine systems.
//!
//! Submodules overview
//! - [`collision`] – run the collision pipeline against the ECS world
//! - [`events`] – dispatch queued physics events once per frame
//! - [`movement`] – integrate positions from rigid body velocities and time
//! - [`time`] – update simulation time and delta

pub mod collision;
pub mod events;
pub mod movement;
pub mod time;

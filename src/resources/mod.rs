//! ECS resources made available to systems.
//!
//! Overview
//! - `collisionconfig` – INI-backed pipeline and event bus settings
//! - `tilemap` – tile map file format and the collision grid built from it
//! - `worldtime` – simulation time and delta
//!
//! The collision pipeline and physics bus themselves are also resources; see
//! [`crate::systems::collision::setup_collision`].
pub mod collisionconfig;
pub mod tilemap;
pub mod worldtime;

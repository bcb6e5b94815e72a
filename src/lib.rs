//! Aberred Collision library.
//!
//! This module exposes the collision pipeline, the event bus, and the ECS
//! components, resources and systems built on them, for use in integration
//! tests and as a reusable library.

pub mod collision;
pub mod components;
pub mod events;
pub mod game;
pub mod resources;
pub mod systems;

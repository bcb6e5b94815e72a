//! Collision detection and response, independent of any entity storage.
//!
//! The pipeline only sees opaque [`Handle`]s and talks to the outside world
//! through the [`pipeline::CollisionWorld`] trait, so it can run against the
//! bevy `World` (see [`crate::systems::collision`]) or a plain test double.
//!
//! Submodules, leaves first:
//! - [`rect`] – axis-aligned rectangle
//! - [`narrowphase`] – stateless geometric tests and measurements
//! - [`layers`] – collision layers and the interaction matrix
//! - [`quadtree`] – broad phase spatial index, rebuilt every frame
//! - [`body`] – per-collider snapshot read from the world
//! - [`response`] – response classification and strategies
//! - [`contacts`] – ENTER/STAY/EXIT bookkeeping across frames
//! - [`tiles`] – entity vs tile grid checks
//! - [`pipeline`] – per-frame orchestration and statistics
//!
//! Everything here is single-threaded: one caller drives
//! [`pipeline::CollisionPipeline::update`] once per tick.

use std::fmt::Debug;
use std::hash::Hash;

pub mod body;
pub mod contacts;
pub mod layers;
pub mod narrowphase;
pub mod pipeline;
pub mod quadtree;
pub mod rect;
pub mod response;
pub mod tiles;

pub use body::{BodyFlags, ColliderInfo};
pub use layers::{CollisionLayer, LayerMatrix};
pub use pipeline::{CollisionPipeline, CollisionWorld, FrameStats, PipelineSettings};
pub use quadtree::Quadtree;
pub use rect::Rect;
pub use response::{BodyState, ResponseResolver, ResponseType};
pub use tiles::TileCollisionProvider;

/// Opaque reference to an external entity.
///
/// The ordering is only used to store unordered pairs canonically.
pub trait Handle: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {}

impl<T> Handle for T where T: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {}

//! Aberred Collision demo entry point.
//!
//! Runs the collision pipeline headless over a generated arena using:
//! - **bevy_ecs** for entity-component-system architecture
//! - **configparser** for the INI collision settings
//! - **serde_json** for tile maps and the statistics dump
//!
//! # Project Structure
//!
//! - [`collision`] – narrow phase, layers, quadtree, responses and the pipeline
//! - [`components`] – ECS components (position, collider, rigid body, group)
//! - [`events`] – the priority event bus and collision event payloads
//! - [`game`] – demo arena setup and frame schedule
//! - [`resources`] – ECS resources (config, tile map, world time)
//! - [`systems`] – ECS systems (movement, collision, event dispatch, time)
//!
//! # Main Loop
//!
//! 1. Load the collision config and optional tile map
//! 2. Spawn the arena and subscribe the demo listeners
//! 3. For each frame: advance time, move, collide, dispatch events
//! 4. Log a summary and optionally write statistics as JSON
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --frames 600 --entities 200
//! ```

mod collision;
mod components;
mod events;
mod game;
mod resources;
mod systems;

use std::path::PathBuf;
use std::time::Duration;

use bevy_ecs::prelude::*;
use clap::Parser;
use serde::Serialize;

use crate::collision::{CollisionPipeline, FrameStats};
use crate::events::bus::BusCounters;
use crate::game::{ArenaOptions, ArenaSummary, ContactTotals};
use crate::resources::collisionconfig::CollisionConfig;
use crate::resources::tilemap::TileCollisionMap;
use crate::systems::collision::EntityPhysicsBus;

/// Aberred Collision
#[derive(Parser)]
#[command(version, about = "Headless collision pipeline demo")]
struct Cli {
    /// INI file with collision settings.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON tile map for the tile pass.
    #[arg(long, value_name = "PATH")]
    tilemap: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 300)]
    frames: u32,

    /// Number of enemies; other entity kinds scale with it.
    #[arg(long, default_value_t = 40)]
    entities: usize,

    /// Seed for the arena layout.
    #[arg(long, default_value_t = 0x00ab_e44e)]
    seed: u64,

    /// Fixed time step in seconds.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Write a JSON report to this path when done.
    #[arg(long, value_name = "PATH")]
    stats_json: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    frames: u32,
    arena: ArenaSummary,
    last_frame: FrameStats,
    peak_collisions: usize,
    total_processing: Duration,
    contacts: ContactTotals,
    bus: BusCounters,
    remaining_pickups: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CollisionConfig::with_path(path),
        None => CollisionConfig::new(),
    };
    if cli.config.is_some() {
        if let Err(e) = config.load_from_file() {
            log::warn!("{}; using defaults", e);
        }
    }

    let tiles = match &cli.tilemap {
        Some(path) => match TileCollisionMap::load_from_file(path) {
            Ok(map) => Some(map),
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let options = ArenaOptions {
        bounds: config.world_bounds,
        entities: cli.entities,
        seed: cli.seed,
    };

    let mut world = World::new();
    let (_player, arena, listeners) = game::setup_demo(&mut world, &config, tiles, &options);
    let mut schedule = game::build_schedule();

    log::info!("Simulating {} frames at dt={}", cli.frames, cli.dt);
    let mut peak_collisions = 0;
    let mut total_processing = Duration::ZERO;
    for frame in 0..cli.frames {
        game::step(&mut world, &mut schedule, cli.dt);
        let stats = world.resource::<CollisionPipeline<Entity>>().stats();
        peak_collisions = peak_collisions.max(stats.entity_collisions);
        total_processing += stats.processing_time;
        if frame % 60 == 0 {
            log::info!(
                "frame {:>5}: {} entities, {} collisions, {} tile hits, {:?}",
                frame,
                stats.total_entities,
                stats.entity_collisions,
                stats.tile_collisions,
                stats.processing_time
            );
        }
    }

    let report = Report {
        frames: cli.frames,
        remaining_pickups: game::count_group(&mut world, "pickup"),
        arena,
        last_frame: world.resource::<CollisionPipeline<Entity>>().stats(),
        peak_collisions,
        total_processing,
        contacts: listeners.tally.totals(),
        bus: world.resource::<EntityPhysicsBus>().counters(),
    };
    log::info!(
        "Done: {} enters, {} exits, {} triggers, {} pickups left, {:?} in collision",
        report.contacts.enters,
        report.contacts.exits,
        report.contacts.triggers,
        report.remaining_pickups,
        report.total_processing
    );

    if let Some(path) = cli.stats_json {
        let written = serde_json::to_string_pretty(&report)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("Statistics written to {}", path.display()),
            Err(e) => {
                eprintln!("Error writing statistics: {e}");
                std::process::exit(1);
            }
        }
    }
}

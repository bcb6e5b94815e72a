//! Collision configuration resource.
//!
//! Holds the pipeline and event bus tunables, loaded from an INI file.
//! Missing keys keep their defaults, so an empty file is a valid config.
//!
//! # Configuration File Format
//!
//! ```ini
//! [world]
//! x = 0
//! y = 0
//! width = 3200
//! height = 2400
//!
//! [quadtree]
//! enabled = true
//! max_objects = 10
//! max_depth = 5
//!
//! [response]
//! push_transfer = 0.5
//!
//! [events]
//! max_events_per_frame = 100
//! event_timeout = 5.0
//! immediate = false
//!
//! [tiles]
//! enabled = true
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::collision::quadtree::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_OBJECTS};
use crate::collision::response::DEFAULT_PUSH_TRANSFER;
use crate::collision::{PipelineSettings, Rect};
use crate::collision::pipeline::DEFAULT_WORLD_BOUNDS;
use crate::events::bus::{BusEvent, DEFAULT_EVENT_TIMEOUT, DEFAULT_MAX_EVENTS_PER_FRAME, EventBus};

const DEFAULT_CONFIG_PATH: &str = "./collision.ini";

/// Collision configuration resource.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct CollisionConfig {
    /// Area covered by the quadtree root.
    pub world_bounds: Rect,
    /// Use the quadtree broad phase instead of testing every pair.
    pub spatial_partitioning: bool,
    pub max_objects: usize,
    pub max_depth: usize,
    /// Fraction of a pusher's velocity given to the pushed body.
    pub push_transfer: f32,
    pub max_events_per_frame: usize,
    /// Maximum age in seconds of a queued event.
    pub event_timeout: f64,
    /// Dispatch events at publish time instead of queueing them.
    pub immediate_events: bool,
    pub tile_collisions: bool,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            world_bounds: DEFAULT_WORLD_BOUNDS,
            spatial_partitioning: true,
            max_objects: DEFAULT_MAX_OBJECTS,
            max_depth: DEFAULT_MAX_DEPTH,
            push_transfer: DEFAULT_PUSH_TRANSFER,
            max_events_per_frame: DEFAULT_MAX_EVENTS_PER_FRAME,
            event_timeout: DEFAULT_EVENT_TIMEOUT,
            immediate_events: false,
            tile_collisions: true,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file at `config_path`.
    ///
    /// Missing values retain their current values.
    /// Returns an error if the file cannot be read or parsed; nothing is
    /// changed in that case.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply_all(&config)?;
        info!(
            "Loaded collision config from {:?}: world {:?}, quadtree={} ({}/{}), events {}/{}s",
            self.config_path,
            self.world_bounds,
            self.spatial_partitioning,
            self.max_objects,
            self.max_depth,
            self.max_events_per_frame,
            self.event_timeout
        );
        Ok(())
    }

    /// Load configuration from INI text. All or nothing, like
    /// [`CollisionConfig::load_from_file`].
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply_all(&config)
    }

    /// Apply every section to a copy and keep it only if all of them parse.
    fn apply_all(&mut self, config: &Ini) -> Result<(), String> {
        let mut next = self.clone();
        next.apply(config)?;
        *self = next;
        Ok(())
    }

    fn apply(&mut self, config: &Ini) -> Result<(), String> {
        // [world] section
        let mut world = self.world_bounds;
        if let Some(x) = config.getfloat("world", "x")? {
            world.x = x as f32;
        }
        if let Some(y) = config.getfloat("world", "y")? {
            world.y = y as f32;
        }
        if let Some(width) = config.getfloat("world", "width")? {
            world.w = width as f32;
        }
        if let Some(height) = config.getfloat("world", "height")? {
            world.h = height as f32;
        }
        if !world.is_valid() {
            return Err(format!("Invalid world bounds: {:?}", world));
        }
        self.world_bounds = world;

        // [quadtree] section
        if let Some(enabled) = config.getbool("quadtree", "enabled")? {
            self.spatial_partitioning = enabled;
        }
        if let Some(max_objects) = config.getuint("quadtree", "max_objects")? {
            self.max_objects = max_objects.max(1) as usize;
        }
        if let Some(max_depth) = config.getuint("quadtree", "max_depth")? {
            self.max_depth = max_depth as usize;
        }

        // [response] section
        if let Some(transfer) = config.getfloat("response", "push_transfer")? {
            self.push_transfer = transfer as f32;
        }

        // [events] section
        if let Some(max) = config.getuint("events", "max_events_per_frame")? {
            self.max_events_per_frame = max as usize;
        }
        if let Some(timeout) = config.getfloat("events", "event_timeout")? {
            self.event_timeout = timeout;
        }
        if let Some(immediate) = config.getbool("events", "immediate")? {
            self.immediate_events = immediate;
        }

        // [tiles] section
        if let Some(enabled) = config.getbool("tiles", "enabled")? {
            self.tile_collisions = enabled;
        }
        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [world] section
        config.set("world", "x", Some(self.world_bounds.x.to_string()));
        config.set("world", "y", Some(self.world_bounds.y.to_string()));
        config.set("world", "width", Some(self.world_bounds.w.to_string()));
        config.set("world", "height", Some(self.world_bounds.h.to_string()));

        // [quadtree] section
        config.set("quadtree", "enabled", Some(self.spatial_partitioning.to_string()));
        config.set("quadtree", "max_objects", Some(self.max_objects.to_string()));
        config.set("quadtree", "max_depth", Some(self.max_depth.to_string()));

        // [response] section
        config.set("response", "push_transfer", Some(self.push_transfer.to_string()));

        // [events] section
        config.set(
            "events",
            "max_events_per_frame",
            Some(self.max_events_per_frame.to_string()),
        );
        config.set("events", "event_timeout", Some(self.event_timeout.to_string()));
        config.set("events", "immediate", Some(self.immediate_events.to_string()));

        // [tiles] section
        config.set("tiles", "enabled", Some(self.tile_collisions.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved collision config to {:?}", self.config_path);

        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            world_bounds: self.world_bounds,
            max_objects: self.max_objects,
            max_depth: self.max_depth,
            spatial_partitioning: self.spatial_partitioning,
            tile_collisions: self.tile_collisions,
            push_transfer: self.push_transfer,
        }
    }

    /// Event bus configured with the `[events]` settings.
    pub fn event_bus<E: BusEvent>(&self) -> EventBus<E> {
        EventBus::new()
            .with_max_events_per_frame(self.max_events_per_frame)
            .with_event_timeout(self.event_timeout)
            .with_immediate_mode(self.immediate_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollisionConfig::new();
        assert_eq!(config.world_bounds, Rect::new(0.0, 0.0, 3200.0, 2400.0));
        assert_eq!(config.max_objects, 10);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.max_events_per_frame, 100);
        assert!(!config.immediate_events);
        assert_eq!(config.push_transfer, 0.5);
    }

    #[test]
    fn test_load_from_str_partial() {
        let mut config = CollisionConfig::new();
        config
            .load_from_str(
                "[world]\nwidth = 640\nheight = 480\n\n[events]\nimmediate = true\nevent_timeout = 2.5\n",
            )
            .unwrap();
        assert_eq!(config.world_bounds, Rect::new(0.0, 0.0, 640.0, 480.0));
        assert!(config.immediate_events);
        assert_eq!(config.event_timeout, 2.5);
        // untouched
        assert_eq!(config.max_objects, 10);
        assert!(config.tile_collisions);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let mut config = CollisionConfig::new();
        assert!(config.load_from_str("[quadtree]\nmax_depth = deep\n").is_err());
        assert!(config.load_from_str("[world]\nwidth = 0\n").is_err());
        assert_eq!(config.world_bounds, DEFAULT_WORLD_BOUNDS);
    }

    #[test]
    fn test_failed_load_changes_nothing() {
        let mut config = CollisionConfig::new();
        config.max_depth = 3;
        let before = config.clone();
        let result = config.load_from_str(
            "[world]\nwidth = 640\n\n[quadtree]\nmax_objects = 4\n\n[events]\nmax_events_per_frame = lots\n",
        );
        assert!(result.is_err());
        assert_eq!(config, before);
    }

    #[test]
    fn test_missing_file_is_error() {
        let mut config = CollisionConfig::with_path("/nonexistent/collision.ini");
        assert!(config.load_from_file().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!(
            "aberredcollision_config_{}.ini",
            std::process::id()
        ));
        let mut config = CollisionConfig::with_path(&path);
        config.max_depth = 7;
        config.tile_collisions = false;
        config.save_to_file().unwrap();

        let mut reloaded = CollisionConfig::with_path(&path);
        reloaded.load_from_file().unwrap();
        assert_eq!(reloaded.max_depth, 7);
        assert!(!reloaded.tile_collisions);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_settings_and_bus() {
        let mut config = CollisionConfig::new();
        config.max_events_per_frame = 3;
        config.spatial_partitioning = false;
        let settings = config.pipeline_settings();
        assert!(!settings.spatial_partitioning);
        let bus: crate::events::collision::PhysicsBus<u32> = config.event_bus();
        assert_eq!(bus.max_events_per_frame(), 3);
    }
}

//! Tile map file format and the collision grid built from it.
//!
//! Maps are JSON documents:
//!
//! ```json
//! {
//!   "tile_size": 32,
//!   "map_width": 4,
//!   "map_height": 3,
//!   "solid_tiles": [7],
//!   "layers": [
//!     { "name": "ground", "positions": [{ "x": 0, "y": 2, "id": 7 }] },
//!     { "name": "collision", "positions": [{ "x": 3, "y": 0, "id": 0 }] }
//!   ]
//! }
//! ```
//!
//! A cell is solid if any layer places a tile listed in `solid_tiles` there,
//! or if it appears in a layer named `collision`.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::collision::TileCollisionProvider;

/// Name of the layer whose every cell is solid.
pub const COLLISION_LAYER_NAME: &str = "collision";

#[derive(Debug, Deserialize, Serialize)]
pub struct Tileposition {
    pub x: u32,
    pub y: u32,
    pub id: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Tilelayer {
    pub name: String,
    pub positions: Vec<Tileposition>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Tilemap {
    pub tile_size: u32,
    pub map_width: u32,
    pub map_height: u32,
    pub layers: Vec<Tilelayer>,
    /// Tile ids that block movement wherever they are placed.
    #[serde(default)]
    pub solid_tiles: Vec<u32>,
}

/// Solid/free grid used by the collision pipeline's tile pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TileCollisionMap {
    tile_size: f32,
    columns: u32,
    rows: u32,
    solid: Vec<bool>,
}

impl TileCollisionMap {
    /// Grid with every cell free.
    pub fn new(columns: u32, rows: u32, tile_size: f32) -> Self {
        Self {
            tile_size,
            columns,
            rows,
            solid: vec![false; columns as usize * rows as usize],
        }
    }

    pub fn from_tilemap(map: &Tilemap) -> Self {
        let mut grid = Self::new(map.map_width, map.map_height, map.tile_size as f32);
        for layer in &map.layers {
            let whole_layer = layer.name.eq_ignore_ascii_case(COLLISION_LAYER_NAME);
            for tile in &layer.positions {
                if !(whole_layer || map.solid_tiles.contains(&tile.id)) {
                    continue;
                }
                if !grid.set_solid(tile.x, tile.y, true) {
                    warn!(
                        "Tile ({}, {}) in layer '{}' is outside the {}x{} map",
                        tile.x, tile.y, layer.name, map.map_width, map.map_height
                    );
                }
            }
        }
        grid
    }

    /// Parse a JSON tile map.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let map: Tilemap =
            serde_json::from_str(json).map_err(|e| format!("Failed to parse tilemap: {}", e))?;
        if map.tile_size == 0 {
            return Err("Tilemap tile_size must be positive".to_string());
        }
        Ok(Self::from_tilemap(&map))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read tilemap {:?}: {}", path, e))?;
        let grid = Self::from_json(&json)?;
        info!(
            "Loaded tilemap {:?}: {}x{} tiles of {}, {} solid",
            path,
            grid.columns,
            grid.rows,
            grid.tile_size,
            grid.solid_count()
        );
        Ok(grid)
    }

    /// Mark a cell. Returns `false` if the cell is outside the grid.
    pub fn set_solid(&mut self, x: u32, y: u32, solid: bool) -> bool {
        match self.cell(x, y) {
            Some(index) => {
                self.solid[index] = solid;
                true
            }
            None => false,
        }
    }

    pub fn solid_count(&self) -> usize {
        self.solid.iter().filter(|s| **s).count()
    }

    fn cell(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.columns && y < self.rows {
            Some(y as usize * self.columns as usize + x as usize)
        } else {
            None
        }
    }
}

impl TileCollisionProvider for TileCollisionMap {
    fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn grid_size(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn is_tile_collidable_at(&self, tile_x: u32, tile_y: u32) -> bool {
        self.cell(tile_x, tile_y).is_none_or(|index| self.solid[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "tile_size": 32,
        "map_width": 4,
        "map_height": 3,
        "solid_tiles": [7],
        "layers": [
            { "name": "ground", "positions": [
                { "x": 0, "y": 2, "id": 7 },
                { "x": 1, "y": 2, "id": 1 }
            ]},
            { "name": "Collision", "positions": [
                { "x": 3, "y": 0, "id": 0 },
                { "x": 9, "y": 9, "id": 0 }
            ]}
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let grid = TileCollisionMap::from_json(MAP).unwrap();
        assert_eq!(grid.grid_size(), (4, 3));
        assert_eq!(grid.tile_size(), 32.0);
        assert!(grid.is_tile_collidable_at(0, 2));
        assert!(!grid.is_tile_collidable_at(1, 2));
        assert!(grid.is_tile_collidable_at(3, 0));
        assert_eq!(grid.solid_count(), 2);
    }

    #[test]
    fn test_solid_tiles_optional() {
        let grid = TileCollisionMap::from_json(
            r#"{"tile_size": 16, "map_width": 2, "map_height": 2, "layers": []}"#,
        )
        .unwrap();
        assert_eq!(grid.solid_count(), 0);
    }

    #[test]
    fn test_out_of_grid_collidable() {
        let grid = TileCollisionMap::new(2, 2, 16.0);
        assert!(!grid.is_tile_collidable_at(1, 1));
        assert!(grid.is_tile_collidable_at(2, 0));
    }

    #[test]
    fn test_bad_json() {
        assert!(TileCollisionMap::from_json("{").is_err());
        assert!(
            TileCollisionMap::from_json(
                r#"{"tile_size": 0, "map_width": 2, "map_height": 2, "layers": []}"#
            )
            .is_err()
        );
    }
}

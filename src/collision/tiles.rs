//! Entity vs tile grid collision.
//!
//! Tiles are checked with a plain grid walk over the tiles a rectangle
//! covers, not through the quadtree. Anything outside the grid counts as
//! solid so entities cannot leave the map.

use glam::Vec2;

use super::rect::Rect;

/// Static tile grid the pipeline can test entity bounds against.
pub trait TileCollisionProvider {
    /// Edge length of a square tile in world units.
    fn tile_size(&self) -> f32;

    /// Grid size in tiles as `(columns, rows)`.
    fn grid_size(&self) -> (u32, u32);

    /// `true` if the tile at `(tile_x, tile_y)` blocks movement.
    ///
    /// Only called with coordinates inside the grid.
    fn is_tile_collidable_at(&self, tile_x: u32, tile_y: u32) -> bool;
}

/// Inclusive tile coordinate range covered by a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpan {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
}

impl TileSpan {
    /// Tiles covered by `bounds`. Edges are half-open, so a rectangle ending
    /// exactly on a tile border does not cover the next tile.
    pub fn covering(bounds: &Rect, tile_size: f32) -> Self {
        Self {
            left: (bounds.x / tile_size).floor() as i64,
            right: (bounds.right() / tile_size).ceil() as i64 - 1,
            top: (bounds.y / tile_size).floor() as i64,
            bottom: (bounds.bottom() / tile_size).ceil() as i64 - 1,
        }
    }

    fn inside(&self, columns: u32, rows: u32) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right < i64::from(columns)
            && self.bottom < i64::from(rows)
    }
}

/// `true` if `bounds` covers a collidable tile or leaves the grid.
///
/// A provider with a non-positive tile size never collides.
pub fn bounds_hit_tiles<P>(provider: &P, bounds: &Rect) -> bool
where
    P: TileCollisionProvider + ?Sized,
{
    let tile_size = provider.tile_size();
    if tile_size.is_nan() || tile_size <= 0.0 || !bounds.is_valid() {
        return false;
    }
    let (columns, rows) = provider.grid_size();
    let span = TileSpan::covering(bounds, tile_size);
    if !span.inside(columns, rows) {
        return true;
    }
    for tile_y in span.top..=span.bottom {
        for tile_x in span.left..=span.right {
            if provider.is_tile_collidable_at(tile_x as u32, tile_y as u32) {
                return true;
            }
        }
    }
    false
}

/// Outcome of moving a rectangle through the tile grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileMotion {
    /// Requested motion with blocked axes zeroed.
    pub allowed: Vec2,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

impl TileMotion {
    pub fn blocked(&self) -> bool {
        self.blocked_x || self.blocked_y
    }
}

/// Test each axis of `delta` on its own and block the axes that would end up
/// in a collidable tile. Axes with no motion are never blocked.
pub fn resolve_tile_motion<P>(provider: &P, bounds: &Rect, delta: Vec2) -> TileMotion
where
    P: TileCollisionProvider + ?Sized,
{
    let blocked_x =
        delta.x != 0.0 && bounds_hit_tiles(provider, &bounds.translated(Vec2::new(delta.x, 0.0)));
    let blocked_y =
        delta.y != 0.0 && bounds_hit_tiles(provider, &bounds.translated(Vec2::new(0.0, delta.y)));
    TileMotion {
        allowed: Vec2::new(
            if blocked_x { 0.0 } else { delta.x },
            if blocked_y { 0.0 } else { delta.y },
        ),
        blocked_x,
        blocked_y,
    }
}

//! Collision layers and the layer interaction matrix.
//!
//! Every collider belongs to exactly one [`CollisionLayer`]. The
//! [`LayerMatrix`] decides which layers may interact at all; pairs rejected
//! here never reach the narrow phase.
//!
//! # Default rules
//!
//! | Layer        | Collides with                                             |
//! |--------------|-----------------------------------------------------------|
//! | DEFAULT      | everything                                                |
//! | PLAYER       | ENEMY, ENVIRONMENT, WALL, WATER, PLATFORM, TRIGGER, PICKUP |
//! | ENEMY        | PLAYER, ENVIRONMENT, WALL, WATER, PLATFORM, PROJECTILE    |
//! | ENVIRONMENT  | PLAYER, ENEMY, PROJECTILE                                 |
//! | PROJECTILE   | PLAYER, ENEMY, ENVIRONMENT, WALL, WATER                   |
//! | TRIGGER      | PLAYER, ENEMY                                             |
//! | PICKUP       | PLAYER                                                    |
//! | WALL / WATER | PLAYER, ENEMY, PROJECTILE                                 |
//! | PLATFORM     | PLAYER, ENEMY                                             |
//! | 10..31       | everything                                                |
//!
//! A row lists what a layer is willing to collide with. The pipeline only
//! accepts a pair when both rows agree, see [`LayerMatrix::pair_allowed`].

use std::fmt;

use log::warn;

/// Number of layers representable by the matrix.
pub const MAX_LAYERS: usize = 32;

/// Small integer tag classifying a collider for selective filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CollisionLayer(pub u8);

impl CollisionLayer {
    pub const DEFAULT: Self = Self(0);
    pub const PLAYER: Self = Self(1);
    pub const ENEMY: Self = Self(2);
    pub const ENVIRONMENT: Self = Self(3);
    pub const PROJECTILE: Self = Self(4);
    pub const TRIGGER: Self = Self(5);
    pub const PICKUP: Self = Self(6);
    pub const WALL: Self = Self(7);
    pub const WATER: Self = Self(8);
    pub const PLATFORM: Self = Self(9);

    const NAMES: [&'static str; 10] = [
        "Default",
        "Player",
        "Enemy",
        "Environment",
        "Projectile",
        "Trigger",
        "Pickup",
        "Wall",
        "Water",
        "Platform",
    ];

    /// Human readable name, `None` for unnamed layers.
    pub fn name(&self) -> Option<&'static str> {
        Self::NAMES.get(self.0 as usize).copied()
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    fn bit(&self) -> u32 {
        1u32 << self.0
    }

    fn in_range(&self) -> bool {
        self.index() < MAX_LAYERS
    }
}

impl fmt::Display for CollisionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Layer({})", self.0),
        }
    }
}

/// Which layers a given layer may collide with, one bit mask per layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerMatrix {
    rows: [u32; MAX_LAYERS],
}

impl Default for LayerMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerMatrix {
    /// Matrix populated with the default rule table.
    pub fn new() -> Self {
        let mut rows = [0u32; MAX_LAYERS];
        for (layer, row) in rows.iter_mut().enumerate() {
            *row = default_row(CollisionLayer(layer as u8));
        }
        Self { rows }
    }

    /// Matrix where every layer collides with every other layer.
    pub fn allow_all() -> Self {
        Self {
            rows: [u32::MAX; MAX_LAYERS],
        }
    }

    /// Matrix where nothing collides until rules are added.
    pub fn deny_all() -> Self {
        Self {
            rows: [0; MAX_LAYERS],
        }
    }

    /// `true` if layer `a` is willing to collide with layer `b`.
    ///
    /// This is a one-directional lookup into `a`'s row. Layers outside the
    /// matrix never collide.
    pub fn may_collide(&self, a: CollisionLayer, b: CollisionLayer) -> bool {
        if !a.in_range() || !b.in_range() {
            return false;
        }
        self.rows[a.index()] & b.bit() != 0
    }

    /// Mutual check used by the pipeline: both rows must allow the pair.
    pub fn pair_allowed(&self, a: CollisionLayer, b: CollisionLayer) -> bool {
        self.may_collide(a, b) && self.may_collide(b, a)
    }

    /// Allow or forbid collisions between `a` and `b`, updating both
    /// directions. Use [`LayerMatrix::set_directed_rule`] to change one row.
    pub fn set_rule(&mut self, a: CollisionLayer, b: CollisionLayer, allowed: bool) {
        self.set_directed_rule(a, b, allowed);
        self.set_directed_rule(b, a, allowed);
    }

    /// Update only `a`'s row.
    pub fn set_directed_rule(&mut self, a: CollisionLayer, b: CollisionLayer, allowed: bool) {
        if !a.in_range() || !b.in_range() {
            warn!(target: "collision", "Ignoring layer rule {a} -> {b}: layer out of range");
            return;
        }
        if allowed {
            self.rows[a.index()] |= b.bit();
        } else {
            self.rows[a.index()] &= !b.bit();
        }
    }

    /// Raw mask of the layers `layer` collides with.
    pub fn row(&self, layer: CollisionLayer) -> u32 {
        if layer.in_range() {
            self.rows[layer.index()]
        } else {
            0
        }
    }
}

fn mask(layers: &[CollisionLayer]) -> u32 {
    layers.iter().fold(0, |acc, layer| acc | layer.bit())
}

fn default_row(layer: CollisionLayer) -> u32 {
    use CollisionLayer as L;
    match layer {
        L::PLAYER => mask(&[
            L::ENEMY,
            L::ENVIRONMENT,
            L::WALL,
            L::WATER,
            L::PLATFORM,
            L::TRIGGER,
            L::PICKUP,
        ]),
        L::ENEMY => mask(&[
            L::PLAYER,
            L::ENVIRONMENT,
            L::WALL,
            L::WATER,
            L::PLATFORM,
            L::PROJECTILE,
        ]),
        L::ENVIRONMENT => mask(&[L::PLAYER, L::ENEMY, L::PROJECTILE]),
        L::PROJECTILE => mask(&[L::PLAYER, L::ENEMY, L::ENVIRONMENT, L::WALL, L::WATER]),
        L::TRIGGER => mask(&[L::PLAYER, L::ENEMY]),
        L::PICKUP => mask(&[L::PLAYER]),
        L::WALL | L::WATER => mask(&[L::PLAYER, L::ENEMY, L::PROJECTILE]),
        L::PLATFORM => mask(&[L::PLAYER, L::ENEMY]),
        _ => u32::MAX,
    }
}

//! Shared types used throughout the library.

mod direction;
mod transform;

pub use direction::{Axis, Direction};
pub use transform::{ElementRotation, HolderTransform};

use rustc_hash::FxHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// A block position in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Get the neighboring position in the given direction.
    pub fn neighbor(&self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

/// A typed voxel: namespaced name plus a canonical (sorted) property map.
///
/// Equality is structural. The property map is a `BTreeMap` so canonical
/// ordering is a property of the type, not something callers must maintain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockKey {
    /// Block name, e.g. "minecraft:stone".
    pub name: String,
    /// Block properties, e.g. {"facing": "north"}.
    pub properties: BTreeMap<String, String>,
}

impl BlockKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Get the block ID without namespace (e.g. "stone").
    pub fn id(&self) -> &str {
        self.name.split(':').nth(1).unwrap_or(&self.name)
    }

    /// Get a property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    /// Stable 64-bit fingerprint: name, then sorted `key=value` pairs.
    ///
    /// FxHasher carries no random state, so fingerprints are deterministic
    /// for the lifetime of a build session. They seed weighted variant
    /// selection and key the palette.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.name.hash(&mut hasher);
        for (key, value) in &self.properties {
            key.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Check if this block is in the invisible set (never meshed, never
    /// assigned a palette index).
    pub fn is_invisible(&self) -> bool {
        matches!(
            self.id(),
            "air" | "cave_air" | "void_air" | "barrier" | "light" | "structure_void"
        )
    }
}

/// Render category of a palette entry. Drives per-chunk buffer grouping and
/// the scene adapter's render order / transparency flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Solid,
    Transparent,
    Water,
    Emissive,
    Redstone,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Solid,
        Category::Transparent,
        Category::Water,
        Category::Emissive,
        Category::Redstone,
    ];

    /// Classify a block into its render category.
    pub fn of(block: &BlockKey) -> Category {
        let id = block.id();

        if matches!(id, "water" | "bubble_column" | "water_cauldron") {
            return Category::Water;
        }
        if id == "redstone_wire" {
            return Category::Redstone;
        }
        if matches!(
            id,
            "glowstone"
                | "sea_lantern"
                | "shroomlight"
                | "magma_block"
                | "lava"
                | "jack_o_lantern"
                | "lantern"
                | "soul_lantern"
                | "torch"
                | "soul_torch"
                | "wall_torch"
                | "soul_wall_torch"
                | "fire"
                | "soul_fire"
                | "campfire"
                | "soul_campfire"
                | "beacon"
        ) {
            return Category::Emissive;
        }
        if is_transparent_id(id) {
            return Category::Transparent;
        }
        Category::Solid
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Solid => "solid",
            Category::Transparent => "transparent",
            Category::Water => "water",
            Category::Emissive => "emissive",
            Category::Redstone => "redstone",
        };
        write!(f, "{}", name)
    }
}

/// Blocks whose textures need alpha blending or whose hulls are see-through.
pub(crate) fn is_transparent_id(id: &str) -> bool {
    id == "glass"
        || id.ends_with("_glass")
        || id.ends_with("_glass_pane")
        || id == "glass_pane"
        || matches!(id, "ice" | "frosted_ice" | "slime_block" | "honey_block")
        || id.ends_with("_leaves")
}

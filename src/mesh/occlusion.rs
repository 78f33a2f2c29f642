//! World-level occlusion oracle.
//!
//! Given a block and its position in a world with random read access, this
//! answers which of its six faces are hidden by neighbors. The chunk merger
//! performs the authoritative per-face test against palette occlusion
//! flags; this oracle is the block-identity-level answer hosts use for
//! single-block updates.

use crate::types::{is_transparent_id, BlockKey, BlockPosition, Direction};

/// Random read access over a block world.
pub trait WorldRead {
    fn block_at(&self, pos: BlockPosition) -> Option<&BlockKey>;
}

impl<S: crate::schematic::Schematic> WorldRead for S {
    fn block_at(&self, pos: BlockPosition) -> Option<&BlockKey> {
        self.get_block(pos)
    }
}

/// Answers face-occlusion queries against a world.
pub struct OcclusionOracle<'a, W: WorldRead> {
    world: &'a W,
}

impl<'a, W: WorldRead> OcclusionOracle<'a, W> {
    pub fn new(world: &'a W) -> Self {
        Self { world }
    }

    /// 6-bit mask of faces hidden by neighbors, in the bit order
    /// east, west, up, down, south, north.
    pub fn occluded_faces(&self, block: &BlockKey, pos: BlockPosition) -> u8 {
        let id = block.id();

        // Glass culls only against other glass, before the general
        // transparent-block early-out.
        if is_glass(id) {
            let mut mask = 0u8;
            for dir in Direction::ALL {
                if let Some(neighbor) = self.world.block_at(pos.neighbor(dir)) {
                    if is_glass(neighbor.id()) {
                        mask |= dir.mask();
                    }
                }
            }
            return mask;
        }

        // Extended piston bases are open toward the head: only the face
        // opposite `facing` can be hidden. Checked before the general
        // partial-geometry early-out, which would swallow pistons.
        if matches!(id, "piston" | "sticky_piston")
            && block.property("extended") == Some("true")
        {
            if let Some(facing) = block.property("facing").and_then(Direction::from_name) {
                return facing.opposite().mask();
            }
        }

        if is_non_occluding(block) || is_transparent_id(id) {
            return 0;
        }

        let mut mask = 0u8;
        for dir in Direction::ALL {
            let Some(neighbor) = self.world.block_at(pos.neighbor(dir)) else {
                continue;
            };
            if !is_non_occluding(neighbor) && !is_transparent_id(neighbor.id()) {
                mask |= dir.mask();
            }
        }
        mask
    }
}

/// Glass variants (blocks, not panes) share one culling group.
fn is_glass(id: &str) -> bool {
    (id == "glass" || id.ends_with("_glass")) && !id.ends_with("_glass_pane")
}

/// Blocks whose hulls do not fill the unit cube and therefore never hide a
/// neighbor's face.
pub fn is_non_occluding(block: &BlockKey) -> bool {
    if block.is_invisible() {
        return true;
    }
    let id = block.id();

    if matches!(id, "water" | "lava") {
        return true;
    }

    // Name patterns for partial geometry. Full-cube names that merely
    // contain a pattern ("grass_block", "mushroom_block") are exempted by
    // the `_block` suffix rule, pistons excluded.
    const PARTIAL_PATTERNS: [&str; 40] = [
        "slab", "stairs", "fence", "wall", "door", "trapdoor", "sign", "banner", "button",
        "lever", "torch", "lantern", "pressure_plate", "carpet", "rail", "flower", "sapling",
        "pane", "bars", "chain", "rod", "candle", "head", "skull", "pot", "campfire", "anvil",
        "bell", "hopper", "cauldron", "lectern", "repeater", "comparator", "piston", "vine",
        "ladder", "scaffolding", "grass", "fern", "snow",
    ];

    for pattern in PARTIAL_PATTERNS {
        if id.contains(pattern) {
            if id.ends_with("_block") && !id.contains("piston") {
                continue;
            }
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schematic::MapSchematic;

    fn world(blocks: &[((i32, i32, i32), &str)]) -> MapSchematic {
        let mut schematic = MapSchematic::new();
        for ((x, y, z), name) in blocks {
            schematic.set_block(
                BlockPosition::new(*x, *y, *z),
                BlockKey::new(format!("minecraft:{}", name)),
            );
        }
        schematic
    }

    #[test]
    fn test_lone_block_unoccluded() {
        let w = world(&[((0, 0, 0), "stone")]);
        let oracle = OcclusionOracle::new(&w);
        let stone = BlockKey::new("minecraft:stone");
        assert_eq!(oracle.occluded_faces(&stone, BlockPosition::new(0, 0, 0)), 0);
    }

    #[test]
    fn test_opaque_neighbors_set_bits() {
        let w = world(&[
            ((0, 0, 0), "stone"),
            ((1, 0, 0), "stone"),
            ((0, 1, 0), "dirt"),
        ]);
        let oracle = OcclusionOracle::new(&w);
        let stone = BlockKey::new("minecraft:stone");
        let mask = oracle.occluded_faces(&stone, BlockPosition::new(0, 0, 0));
        assert_eq!(mask, Direction::East.mask() | Direction::Up.mask());
    }

    #[test]
    fn test_transparent_block_returns_zero() {
        let w = world(&[((0, 0, 0), "oak_leaves"), ((1, 0, 0), "stone")]);
        let oracle = OcclusionOracle::new(&w);
        let leaves = BlockKey::new("minecraft:oak_leaves");
        assert_eq!(oracle.occluded_faces(&leaves, BlockPosition::new(0, 0, 0)), 0);
    }

    #[test]
    fn test_non_occluding_neighbor_does_not_cull() {
        let w = world(&[((0, 0, 0), "stone"), ((1, 0, 0), "oak_slab")]);
        let oracle = OcclusionOracle::new(&w);
        let stone = BlockKey::new("minecraft:stone");
        assert_eq!(oracle.occluded_faces(&stone, BlockPosition::new(0, 0, 0)), 0);
    }

    #[test]
    fn test_glass_culls_only_against_glass() {
        let w = world(&[
            ((0, 0, 0), "glass"),
            ((1, 0, 0), "glass"),
            ((0, 1, 0), "stone"),
        ]);
        let oracle = OcclusionOracle::new(&w);
        let glass = BlockKey::new("minecraft:glass");
        let mask = oracle.occluded_faces(&glass, BlockPosition::new(0, 0, 0));
        // The stone above does not hide the glass face; the glass east does.
        assert_eq!(mask, Direction::East.mask());
    }

    #[test]
    fn test_stained_glass_is_a_glass_variant() {
        let w = world(&[((0, 0, 0), "glass"), ((1, 0, 0), "red_stained_glass")]);
        let oracle = OcclusionOracle::new(&w);
        let glass = BlockKey::new("minecraft:glass");
        assert_eq!(
            oracle.occluded_faces(&glass, BlockPosition::new(0, 0, 0)),
            Direction::East.mask()
        );
    }

    #[test]
    fn test_extended_piston_culls_back_only() {
        let w = world(&[
            ((0, 0, 0), "piston"),
            ((1, 0, 0), "stone"),
            ((-1, 0, 0), "stone"),
            ((0, 1, 0), "stone"),
        ]);
        let oracle = OcclusionOracle::new(&w);
        let piston = BlockKey::new("minecraft:piston")
            .with_property("extended", "true")
            .with_property("facing", "east");
        assert_eq!(
            oracle.occluded_faces(&piston, BlockPosition::new(0, 0, 0)),
            Direction::West.mask()
        );
    }

    #[test]
    fn test_retracted_piston_is_non_occluding() {
        let piston = BlockKey::new("minecraft:piston")
            .with_property("extended", "false")
            .with_property("facing", "east");
        assert!(is_non_occluding(&piston));
    }

    #[test]
    fn test_full_cube_names_with_partial_patterns() {
        assert!(!is_non_occluding(&BlockKey::new("minecraft:grass_block")));
        assert!(!is_non_occluding(&BlockKey::new("minecraft:mushroom_block")));
        assert!(is_non_occluding(&BlockKey::new("minecraft:oak_fence")));
        assert!(is_non_occluding(&BlockKey::new("minecraft:snow")));
        assert!(is_non_occluding(&BlockKey::new("minecraft:air")));
    }
}

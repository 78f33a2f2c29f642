//! Chunk partitioning: split a world into axis-aligned chunks of packed
//! block quadruples.

use crate::mesh::Palette;
use crate::schematic::Schematic;
use crate::types::BlockPosition;
use std::collections::BTreeMap;

/// Number of i32 lanes per packed block: x, y, z, palette_index.
pub const BLOCK_STRIDE: usize = 4;

/// An axis-aligned chunk of the world, the unit of worker dispatch.
///
/// `blocks` is a flat i32 array of `(x, y, z, palette_index)` quadruples in
/// absolute world coordinates; `origin` is the chunk's minimum corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub origin: [i32; 3],
    pub size: [u32; 3],
    pub blocks: Vec<i32>,
}

impl Chunk {
    pub fn block_count(&self) -> usize {
        self.blocks.len() / BLOCK_STRIDE
    }

    /// Split this chunk in half along its longest axis (x wins ties),
    /// reassigning blocks. Returns `None` when no axis can be split.
    pub fn split(&self) -> Option<(Chunk, Chunk)> {
        let axis = if self.size[0] >= self.size[1] && self.size[0] >= self.size[2] {
            0
        } else if self.size[1] >= self.size[2] {
            1
        } else {
            2
        };
        if self.size[axis] < 2 {
            return None;
        }

        let half = self.size[axis] / 2;
        let cut = self.origin[axis] + half as i32;

        let mut low_size = self.size;
        low_size[axis] = half;
        let mut high_size = self.size;
        high_size[axis] = self.size[axis] - half;
        let mut high_origin = self.origin;
        high_origin[axis] = cut;

        let mut low = Chunk {
            origin: self.origin,
            size: low_size,
            blocks: Vec::new(),
        };
        let mut high = Chunk {
            origin: high_origin,
            size: high_size,
            blocks: Vec::new(),
        };

        for quad in self.blocks.chunks_exact(BLOCK_STRIDE) {
            if quad[axis] < cut {
                low.blocks.extend_from_slice(quad);
            } else {
                high.blocks.extend_from_slice(quad);
            }
        }

        Some((low, high))
    }
}

/// Partition a schematic into chunks of side `chunk_side`.
///
/// Chunks come out in lexicographic order of their chunk coordinates;
/// blocks within a chunk in lexicographic order of world coordinates.
/// Invisible blocks and blocks missing from the palette are dropped.
pub fn partition(
    schematic: &dyn Schematic,
    palette: &Palette,
    chunk_side: u32,
) -> Vec<Chunk> {
    let side = chunk_side.max(1) as i32;

    let mut by_chunk: BTreeMap<(i32, i32, i32), Vec<(BlockPosition, u32)>> = BTreeMap::new();
    for (pos, block) in schematic.iter_blocks() {
        if block.is_invisible() {
            continue;
        }
        let Some(index) = palette.index_of(block) else {
            continue;
        };
        let coord = (
            pos.x.div_euclid(side),
            pos.y.div_euclid(side),
            pos.z.div_euclid(side),
        );
        by_chunk.entry(coord).or_default().push((pos, index));
    }

    by_chunk
        .into_iter()
        .map(|((cx, cy, cz), mut blocks)| {
            blocks.sort_by_key(|(pos, _)| (pos.x, pos.y, pos.z));
            let mut packed = Vec::with_capacity(blocks.len() * BLOCK_STRIDE);
            for (pos, index) in blocks {
                packed.extend_from_slice(&[pos.x, pos.y, pos.z, index as i32]);
            }
            Chunk {
                origin: [cx * side, cy * side, cz * side],
                size: [chunk_side; 3],
                blocks: packed,
            }
        })
        .collect()
}

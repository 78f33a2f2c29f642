//! Greedy meshing: merge coplanar same-material full unit faces into larger
//! rectangles before quantization.
//!
//! Only faces a palette entry exposes as a single full-square boundary quad
//! participate; everything else goes through the per-triangle path
//! untouched. Off by default because merging changes vertex counts.

use crate::mesh::Palette;
use crate::types::{Category, Direction};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Block offsets (into the packed block array) whose faces were taken over
/// by the greedy pass, with a per-offset face mask.
#[derive(Debug, Default)]
pub(crate) struct ConsumedFaces(FxHashMap<usize, u8>);

impl ConsumedFaces {
    /// Mask of faces consumed for the block at `offset` (0 if none).
    pub(crate) fn face_mask(&self, offset: usize) -> u8 {
        self.0.get(&offset).copied().unwrap_or(0)
    }
}

/// Plane key: category, direction bit, and the layer coordinate of the
/// face plane in chunk-local units.
type PlaneKey = (Category, u8, i32);

/// Unit faces collected per plane, keyed by their in-plane cell.
#[derive(Debug, Default)]
pub(crate) struct PlaneRects {
    planes: BTreeMap<PlaneKey, BTreeMap<(i32, i32), u32>>,
}

/// A merged rectangle of unit faces.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MergedRect {
    pub category: Category,
    pub direction: Direction,
    /// Face-plane coordinate along the direction's axis.
    pub layer: i32,
    pub u: i32,
    pub v: i32,
    pub width: i32,
    pub height: i32,
    pub material: u32,
}

/// In-plane axis mapping for a direction: (u axis, v axis).
fn plane_axes(direction: Direction) -> (usize, usize) {
    match direction.axis() {
        crate::types::Axis::Y => (0, 2),
        crate::types::Axis::Z => (0, 1),
        crate::types::Axis::X => (2, 1),
    }
}

/// Walk all batched blocks, claim their survivable full faces into plane
/// maps, and report which block faces were consumed.
pub(crate) fn collect_full_faces(
    palette: &Palette,
    batches: &BTreeMap<(Category, u32), Vec<usize>>,
    blocks: &[i32],
    origin: [i32; 3],
    grid_at: impl Fn([i32; 3]) -> u32,
    planes: &mut PlaneRects,
) -> ConsumedFaces {
    let mut consumed = ConsumedFaces::default();

    for ((category, palette_index), offsets) in batches {
        let Some(entry) = palette.get(*palette_index) else {
            continue;
        };

        for &offset in offsets {
            let local = [
                blocks[offset] - origin[0],
                blocks[offset + 1] - origin[1],
                blocks[offset + 2] - origin[2],
            ];

            for direction in Direction::ALL {
                let Some(material) = entry.full_faces[direction.bit() as usize] else {
                    continue;
                };

                // The face leaves the per-triangle path either way: culled
                // faces vanish, surviving faces merge.
                let mask = consumed.0.entry(offset).or_insert(0);
                *mask |= direction.mask();

                let (dx, dy, dz) = direction.offset();
                let neighbor = grid_at([local[0] + dx, local[1] + dy, local[2] + dz]);
                if neighbor != 0 {
                    if let Some(neighbor_entry) = palette.get(neighbor - 1) {
                        if neighbor_entry.occlusion_flags & direction.opposite().mask() != 0 {
                            continue;
                        }
                    }
                }

                let axis = direction.axis().index();
                let layer = if direction.is_positive() {
                    local[axis] + 1
                } else {
                    local[axis]
                };
                let (ua, va) = plane_axes(direction);
                planes
                    .planes
                    .entry((*category, direction.bit(), layer))
                    .or_default()
                    .insert((local[ua], local[va]), material);
            }
        }
    }

    consumed
}

/// Merge each plane's unit cells into maximal rectangles, deterministic in
/// plane and cell order.
pub(crate) fn merge_rects(planes: &PlaneRects) -> Vec<MergedRect> {
    let mut rects = Vec::new();

    for (&(category, dir_bit, layer), cells) in &planes.planes {
        let direction = Direction::ALL[dir_bit as usize];
        let mut remaining = cells.clone();

        loop {
            let Some((u, v, material)) = remaining
                .iter()
                .next()
                .map(|(&(u, v), &material)| (u, v, material))
            else {
                break;
            };
            // Grow width along +u.
            let mut width = 1;
            while remaining.get(&(u + width, v)) == Some(&material) {
                width += 1;
            }
            // Grow height along +v while every column matches.
            let mut height = 1;
            'rows: loop {
                for du in 0..width {
                    if remaining.get(&(u + du, v + height)) != Some(&material) {
                        break 'rows;
                    }
                }
                height += 1;
            }

            for du in 0..width {
                for dv in 0..height {
                    remaining.remove(&(u + du, v + dv));
                }
            }

            rects.push(MergedRect {
                category,
                direction,
                layer,
                u,
                v,
                width,
                height,
                material,
            });
        }
    }

    rects
}

/// Geometry of a merged rectangle in chunk-local coordinates: corner
/// positions, face normal, and tiled UVs (same corner convention as the
/// block mesh builder).
pub(crate) fn rect_geometry(rect: &MergedRect) -> ([[f32; 3]; 4], [f32; 3], [[f32; 2]; 4]) {
    let axis = rect.direction.axis().index();
    let (ua, va) = plane_axes(rect.direction);

    let mut from = [0.0f32; 3];
    let mut to = [0.0f32; 3];
    from[axis] = rect.layer as f32;
    to[axis] = rect.layer as f32;
    from[ua] = rect.u as f32;
    to[ua] = (rect.u + rect.width) as f32;
    from[va] = rect.v as f32;
    to[va] = (rect.v + rect.height) as f32;

    let positions = crate::mesh::block::corner_positions(rect.direction, from, to);

    // The in-plane extent of the quad becomes a tiled UV rectangle.
    let uvs = crate::mesh::block::corner_uvs(
        [0.0, 0.0, rect.width as f32, rect.height as f32],
        0,
    );

    (positions, rect.direction.normal(), uvs)
}

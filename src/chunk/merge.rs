//! Chunk mesh merging: cull hidden faces against an occupancy map and pack
//! surviving triangles into per-category quantized buffers.

use crate::chunk::greedy::{self, PlaneRects};
use crate::chunk::partition::BLOCK_STRIDE;
use crate::error::{MeshError, Result};
use crate::mesh::palette::{GeometryGroup, Palette};
use crate::pool::transport::BufferPool;
use crate::types::{Category, Direction};
use bytemuck::cast_slice;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fixed-point factor for quantized vertex positions.
pub const POSITION_SCALE: f32 = 1024.0;

/// Scale factor for i8 normals.
pub const NORMAL_SCALE: f32 = 127.0;

/// Boundary-flush tolerance. Coordinates within this of 0, 1, or the
/// half-block mid-plane count as flush.
const FLUSH_TOL: f32 = 1e-4;

/// A contiguous index range drawn with one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawGroup {
    /// First index of the range.
    pub start: u32,
    /// Number of indices.
    pub count: u32,
    pub material_index: u32,
}

/// Vertex positions: quantized i16 for chunk-local meshes, f32 world
/// coordinates for batched output.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionBuffer {
    Quantized(Vec<i16>),
    World(Vec<f32>),
}

impl PositionBuffer {
    pub fn len(&self) -> usize {
        match self {
            PositionBuffer::Quantized(v) => v.len(),
            PositionBuffer::World(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Triangle indices, u16 unless the vertex count needs u32.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }
}

/// The merged buffers for one render category of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMesh {
    pub positions: PositionBuffer,
    /// i8 normals, quantized by 127.
    pub normals: Vec<i8>,
    /// f32 UV passthrough.
    pub uvs: Vec<f32>,
    pub indices: IndexBuffer,
    pub groups: Vec<DrawGroup>,
    /// World-space translation of the mesh node. Zero for batched output.
    pub origin: [f32; 3],
}

impl MergedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw bytes of the position buffer. Zero-allocation view.
    pub fn positions_bytes(&self) -> &[u8] {
        match &self.positions {
            PositionBuffer::Quantized(v) => cast_slice(v),
            PositionBuffer::World(v) => cast_slice(v),
        }
    }

    /// Raw bytes of the normal buffer. Zero-allocation view.
    pub fn normals_bytes(&self) -> &[u8] {
        cast_slice(&self.normals)
    }

    /// Raw bytes of the UV buffer. Zero-allocation view.
    pub fn uvs_bytes(&self) -> &[u8] {
        cast_slice(&self.uvs)
    }

    /// Raw bytes of the index buffer. Zero-allocation view.
    pub fn indices_bytes(&self) -> &[u8] {
        match &self.indices {
            IndexBuffer::U16(v) => cast_slice(v),
            IndexBuffer::U32(v) => cast_slice(v),
        }
    }

    /// Dequantized world-space position of a vertex (undoes the i16
    /// quantization and applies the origin).
    pub fn world_position(&self, vertex: usize) -> [f32; 3] {
        let i = vertex * 3;
        match &self.positions {
            PositionBuffer::Quantized(v) => [
                v[i] as f32 / POSITION_SCALE + self.origin[0],
                v[i + 1] as f32 / POSITION_SCALE + self.origin[1],
                v[i + 2] as f32 / POSITION_SCALE + self.origin[2],
            ],
            PositionBuffer::World(v) => [v[i], v[i + 1], v[i + 2]],
        }
    }

    /// Append another world-position mesh into this one (batched mode).
    /// Panics if either mesh carries quantized positions.
    pub fn concat(&mut self, other: MergedMesh) {
        let (PositionBuffer::World(mine), PositionBuffer::World(theirs)) =
            (&mut self.positions, other.positions)
        else {
            panic!("concat requires world-position meshes");
        };

        let vertex_offset = (mine.len() / 3) as u32;
        let index_offset = self.indices.len() as u32;

        mine.extend(theirs);
        self.normals.extend(other.normals);
        self.uvs.extend(other.uvs);

        // Widen to u32 before appending; batched buffers routinely outgrow
        // the u16 range.
        if let IndexBuffer::U16(v) = &self.indices {
            let widened: Vec<u32> = v.iter().map(|&i| i as u32).collect();
            self.indices = IndexBuffer::U32(widened);
        }
        let IndexBuffer::U32(indices) = &mut self.indices else {
            unreachable!("indices widened above");
        };
        match other.indices {
            IndexBuffer::U16(v) => indices.extend(v.into_iter().map(|i| i as u32 + vertex_offset)),
            IndexBuffer::U32(v) => indices.extend(v.into_iter().map(|i| i + vertex_offset)),
        }

        for group in other.groups {
            let shifted = DrawGroup {
                start: group.start + index_offset,
                count: group.count,
                material_index: group.material_index,
            };
            match self.groups.last_mut() {
                Some(last)
                    if last.material_index == shifted.material_index
                        && last.start + last.count == shifted.start =>
                {
                    last.count += shifted.count;
                }
                _ => self.groups.push(shifted),
            }
        }
    }
}

/// Whether merged positions are chunk-local quantized or world-space f32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Quantized,
    World,
}

/// Growable per-category accumulator.
#[derive(Default)]
struct Accumulator {
    positions_q: Vec<i16>,
    positions_f: Vec<f32>,
    normals: Vec<i8>,
    uvs: Vec<f32>,
    indices: Vec<u32>,
    groups: Vec<DrawGroup>,
}

impl Accumulator {
    fn vertex_count(&self) -> usize {
        self.normals.len() / 3
    }

    /// Extend the current draw group or open a new one.
    fn begin_material(&mut self, material_index: u32) {
        match self.groups.last() {
            Some(last) if last.material_index == material_index => {}
            _ => self.groups.push(DrawGroup {
                start: self.indices.len() as u32,
                count: 0,
                material_index,
            }),
        }
    }

    fn push_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.extend_from_slice(&[i0, i1, i2]);
        self.groups
            .last_mut()
            .expect("begin_material precedes triangles")
            .count += 3;
    }

    fn finish(self, mode: MergeMode, origin: [f32; 3]) -> MergedMesh {
        let vertex_count = self.vertex_count();
        let positions = match mode {
            MergeMode::Quantized => {
                let mut v = self.positions_q;
                v.shrink_to_fit();
                PositionBuffer::Quantized(v)
            }
            MergeMode::World => {
                let mut v = self.positions_f;
                v.shrink_to_fit();
                PositionBuffer::World(v)
            }
        };

        // u16 indices unless the vertex count demands u32.
        let indices = if vertex_count > u16::MAX as usize {
            IndexBuffer::U32(self.indices)
        } else {
            IndexBuffer::U16(self.indices.into_iter().map(|i| i as u16).collect())
        };

        let origin = match mode {
            MergeMode::Quantized => origin,
            MergeMode::World => [0.0; 3],
        };

        MergedMesh {
            positions,
            normals: self.normals,
            uvs: self.uvs,
            indices,
            groups: self.groups,
            origin,
        }
    }
}

/// Merges chunk block arrays into per-category buffers against a palette.
pub struct ChunkMesher {
    palette: Arc<Palette>,
    greedy: bool,
    grids: BufferPool<u32>,
}

impl ChunkMesher {
    pub fn new(palette: Arc<Palette>, greedy: bool) -> Self {
        Self {
            palette,
            greedy,
            grids: BufferPool::new(),
        }
    }

    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    /// Merge one chunk. `blocks` is the packed `(x, y, z, palette_index)`
    /// array; `origin` the chunk's minimum corner. Blocks with stale
    /// palette indices are skipped, not fatal.
    pub fn merge(
        &mut self,
        blocks: &[i32],
        origin: [i32; 3],
        mode: MergeMode,
    ) -> Result<Vec<(Category, MergedMesh)>> {
        if blocks.is_empty() {
            return Ok(Vec::new());
        }

        // Tight extent of the chunk's content.
        let mut extent = [1u32; 3];
        for quad in blocks.chunks_exact(BLOCK_STRIDE) {
            for axis in 0..3 {
                let local = quad[axis] - origin[axis];
                if local >= 0 {
                    extent[axis] = extent[axis].max(local as u32 + 1);
                }
            }
        }

        // Padded occupancy grid: lookups at the boundary degrade to
        // "empty", so cross-chunk culling is skipped conservatively.
        let dims = [extent[0] + 2, extent[1] + 2, extent[2] + 2];
        let cells = (dims[0] * dims[1] * dims[2]) as usize;
        let mut grid = self.grids.acquire(cells);
        grid.resize(cells, 0);

        let cell_index = |lx: i32, ly: i32, lz: i32| -> usize {
            let x = (lx + 1) as u32;
            let y = (ly + 1) as u32;
            let z = (lz + 1) as u32;
            (x + y * dims[0] + z * dims[0] * dims[1]) as usize
        };

        for quad in blocks.chunks_exact(BLOCK_STRIDE) {
            let local = [
                quad[0] - origin[0],
                quad[1] - origin[1],
                quad[2] - origin[2],
            ];
            if local.iter().any(|&l| l < 0)
                || (0..3).any(|i| local[i] as u32 >= extent[i])
            {
                continue;
            }
            grid[cell_index(local[0], local[1], local[2])] = quad[3] as u32 + 1;
        }

        // Batch all instances of the same block type per category. Blocks
        // whose locals fall outside the extent are dropped defensively.
        let mut batches: BTreeMap<(Category, u32), Vec<usize>> = BTreeMap::new();
        for (i, quad) in blocks.chunks_exact(BLOCK_STRIDE).enumerate() {
            let index = quad[3] as u32;
            let Some(entry) = self.palette.get(index) else {
                continue;
            };
            let in_range = (0..3).all(|axis| {
                let local = quad[axis] - origin[axis];
                local >= 0 && (local as u32) < extent[axis]
            });
            if !in_range {
                continue;
            }
            batches
                .entry((entry.category, index))
                .or_default()
                .push(i * BLOCK_STRIDE);
        }

        // Greedy pre-pass: collect survivable full faces and note which
        // block faces it consumed.
        let consumed = if self.greedy {
            let mut planes = PlaneRects::default();
            let consumed = greedy::collect_full_faces(
                &self.palette,
                &batches,
                blocks,
                origin,
                |l| grid[cell_index(l[0], l[1], l[2])],
                &mut planes,
            );
            Some((consumed, planes))
        } else {
            None
        };

        let mut accumulators: BTreeMap<Category, Accumulator> = BTreeMap::new();
        let mut remap: Vec<u32> = Vec::new();

        for ((category, palette_index), offsets) in &batches {
            let Some(entry) = self.palette.get(*palette_index) else {
                continue;
            };
            let acc = accumulators.entry(*category).or_default();

            for &offset in offsets {
                let local = [
                    blocks[offset] - origin[0],
                    blocks[offset + 1] - origin[1],
                    blocks[offset + 2] - origin[2],
                ];
                let consumed_faces = consumed
                    .as_ref()
                    .map(|(c, _)| c.face_mask(offset))
                    .unwrap_or(0);

                for group in &entry.groups {
                    self.merge_group(
                        acc,
                        group,
                        local,
                        origin,
                        mode,
                        |l| grid[cell_index(l[0], l[1], l[2])],
                        consumed_faces,
                        &mut remap,
                    )?;
                }
            }
        }

        // Emit merged greedy quads after the per-triangle pass.
        if let Some((_, planes)) = &consumed {
            for rect in greedy::merge_rects(planes) {
                let acc = accumulators.entry(rect.category).or_default();
                let (positions, normal, uvs) = greedy::rect_geometry(&rect);
                emit_quad(acc, rect.material, positions, normal, uvs, mode, origin)?;
            }
        }

        self.grids.release(grid);

        let origin_f = [origin[0] as f32, origin[1] as f32, origin[2] as f32];
        Ok(accumulators
            .into_iter()
            .filter(|(_, acc)| !acc.indices.is_empty())
            .map(|(category, acc)| (category, acc.finish(mode, origin_f)))
            .collect())
    }

    /// Merge one geometry group of one block instance.
    #[allow(clippy::too_many_arguments)]
    fn merge_group(
        &self,
        acc: &mut Accumulator,
        group: &GeometryGroup,
        local: [i32; 3],
        origin: [i32; 3],
        mode: MergeMode,
        grid_at: impl Fn([i32; 3]) -> u32,
        consumed_faces: u8,
        remap: &mut Vec<u32>,
    ) -> Result<()> {
        remap.clear();
        remap.resize(group.vertex_count(), u32::MAX);

        let mut began = false;

        for tri in group.indices.chunks_exact(3) {
            let i0 = tri[0] as usize;

            if let Some(dir) = axis_aligned_direction(&group.normals[i0 * 3..i0 * 3 + 3]) {
                let axis = dir.axis().index();
                let coord = group.positions[i0 * 3 + axis];
                let boundary = if dir.is_positive() { 1.0 } else { 0.0 };

                // Greedy consumed this whole face; its triangles are
                // emitted as merged quads instead.
                if consumed_faces & dir.mask() != 0 && (coord - boundary).abs() < FLUSH_TOL {
                    continue;
                }

                if is_flush(coord) {
                    let (dx, dy, dz) = dir.offset();
                    let neighbor = grid_at([local[0] + dx, local[1] + dy, local[2] + dz]);
                    if neighbor != 0 {
                        if let Some(neighbor_entry) = self.palette.get(neighbor - 1) {
                            if neighbor_entry.occlusion_flags & dir.opposite().mask() != 0 {
                                continue;
                            }
                        }
                    }
                }
            }

            if !began {
                acc.begin_material(group.material_index);
                began = true;
            }

            let mut mapped = [0u32; 3];
            for (slot, &index) in mapped.iter_mut().zip(tri.iter()) {
                let index = index as usize;
                if remap[index] == u32::MAX {
                    remap[index] = push_vertex(acc, group, index, local, origin, mode)?;
                }
                *slot = remap[index];
            }
            acc.push_triangle(mapped[0], mapped[1], mapped[2]);
        }

        Ok(())
    }
}

/// Append one palette vertex to an accumulator, quantizing per mode.
fn push_vertex(
    acc: &mut Accumulator,
    group: &GeometryGroup,
    index: usize,
    local: [i32; 3],
    origin: [i32; 3],
    mode: MergeMode,
) -> Result<u32> {
    let new_index = acc.vertex_count();
    if new_index > u32::MAX as usize {
        return Err(MeshError::IndexOverflow { vertices: new_index });
    }

    for axis in 0..3 {
        let block_local = local[axis] as f32 + group.positions[index * 3 + axis];
        match mode {
            MergeMode::Quantized => {
                let q = (block_local * POSITION_SCALE).round();
                acc.positions_q
                    .push(q.clamp(i16::MIN as f32, i16::MAX as f32) as i16);
            }
            MergeMode::World => {
                acc.positions_f.push(origin[axis] as f32 + block_local);
            }
        }
        acc.normals
            .push((group.normals[index * 3 + axis] * NORMAL_SCALE).round() as i8);
    }
    acc.uvs.push(group.uvs[index * 2]);
    acc.uvs.push(group.uvs[index * 2 + 1]);

    Ok(new_index as u32)
}

/// Snap a normal to a cardinal direction if its Manhattan length is 1.
fn axis_aligned_direction(normal: &[f32]) -> Option<Direction> {
    let manhattan = normal[0].abs() + normal[1].abs() + normal[2].abs();
    if (manhattan - 1.0).abs() > 1e-3 {
        return None;
    }
    for dir in Direction::ALL {
        let n = dir.normal();
        if (0..3).all(|i| (normal[i] - n[i]).abs() < 1e-3) {
            return Some(dir);
        }
    }
    None
}

/// Boundary-flush test: 0, 1, or the half-block mid-plane.
fn is_flush(coord: f32) -> bool {
    coord.abs() < FLUSH_TOL
        || (coord - 1.0).abs() < FLUSH_TOL
        || (coord - 0.5).abs() < FLUSH_TOL
}

/// Emit one merged greedy quad into an accumulator.
fn emit_quad(
    acc: &mut Accumulator,
    material: u32,
    positions: [[f32; 3]; 4],
    normal: [f32; 3],
    uvs: [[f32; 2]; 4],
    mode: MergeMode,
    origin: [i32; 3],
) -> Result<()> {
    acc.begin_material(material);
    let base = acc.vertex_count();
    if base + 4 > u32::MAX as usize {
        return Err(MeshError::IndexOverflow { vertices: base });
    }
    for corner in 0..4 {
        for axis in 0..3 {
            match mode {
                MergeMode::Quantized => {
                    let q = (positions[corner][axis] * POSITION_SCALE).round();
                    acc.positions_q
                        .push(q.clamp(i16::MIN as f32, i16::MAX as f32) as i16);
                }
                MergeMode::World => {
                    acc.positions_f
                        .push(origin[axis] as f32 + positions[corner][axis]);
                }
            }
            acc.normals.push((normal[axis] * NORMAL_SCALE).round() as i8);
        }
        acc.uvs.extend_from_slice(&uvs[corner]);
    }
    let base = base as u32;
    acc.push_triangle(base, base + 1, base + 2);
    acc.push_triangle(base + 2, base + 1, base + 3);
    Ok(())
}

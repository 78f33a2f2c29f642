//! Palette compilation: one canonical pre-baked mesh per distinct block.
//!
//! The palette is built once per build session, before any chunk is meshed,
//! and replicated onto every worker. Entries are append-only and densely
//! indexed; the invisible block set is excluded so occupancy grids can
//! encode "empty" as 0 and real blocks as `index + 1`.

use crate::error::ErrorCounts;
use crate::mesh::block::{BlockMesh, BlockMeshBuilder};
use crate::schematic::Schematic;
use crate::types::{BlockKey, Category, Direction};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::debug;

/// Tolerance for boundary-plane and coverage tests.
const EPS: f32 = 1e-4;

/// Consolidated per-material geometry of a palette entry.
///
/// Positions are block-local [0, 1]; arrays are parallel with 3/3/2 floats
/// per vertex and `(0,1,2)(2,1,3)` index pairs per quad.
#[derive(Debug, Clone, Default)]
pub struct GeometryGroup {
    pub material_index: u32,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
}

impl GeometryGroup {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A pre-baked block in the palette.
#[derive(Debug, Clone)]
pub struct PaletteEntry {
    pub key: BlockKey,
    pub category: Category,
    /// Bit `i` set means face `Direction::ALL[i]` fully covers the unit
    /// square and can hide the neighbor's opposite face.
    pub occlusion_flags: u8,
    pub groups: Vec<GeometryGroup>,
    /// Per face: the material of a single full-square boundary quad with
    /// untransformed UVs, if the face is exactly that. Greedy merging
    /// consumes these.
    pub full_faces: [Option<u32>; 6],
}

impl PaletteEntry {
    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(|g| g.vertex_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// The dense palette of distinct blocks in a schematic.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
    by_fingerprint: FxHashMap<u64, u32>,
}

impl Palette {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&PaletteEntry> {
        self.entries.get(index as usize)
    }

    /// Dense index of a block, if it was compiled.
    pub fn index_of(&self, block: &BlockKey) -> Option<u32> {
        self.by_fingerprint.get(&block.fingerprint()).copied()
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    fn push(&mut self, entry: PaletteEntry) -> u32 {
        let index = self.entries.len() as u32;
        self.by_fingerprint.insert(entry.key.fingerprint(), index);
        self.entries.push(entry);
        index
    }
}

/// Compiles the palette for a schematic.
pub struct PaletteCompiler<'a> {
    builder: BlockMeshBuilder<'a>,
}

impl<'a> PaletteCompiler<'a> {
    pub fn new(builder: BlockMeshBuilder<'a>) -> Self {
        Self { builder }
    }

    /// Walk the schematic's distinct blocks in deterministic (position
    /// lexicographic, first-seen) order and bake each one.
    pub fn compile(&self, schematic: &dyn Schematic, counts: &mut ErrorCounts) -> Palette {
        let mut blocks: Vec<_> = schematic.iter_blocks().collect();
        blocks.sort_by_key(|(pos, _)| (pos.x, pos.y, pos.z));

        let mut palette = Palette::default();
        for (_, block) in blocks {
            if block.is_invisible() {
                continue;
            }
            if palette.by_fingerprint.contains_key(&block.fingerprint()) {
                continue;
            }
            let mesh = self.builder.build(block, counts);
            if mesh.is_empty() {
                debug!(block = %block.name, "palette entry has no geometry");
            }
            palette.push(bake_entry(block.clone(), &mesh));
        }

        palette
    }
}

/// Flatten a block mesh into a palette entry with per-material groups and
/// occlusion flags.
pub fn bake_entry(key: BlockKey, mesh: &BlockMesh) -> PaletteEntry {
    let category = Category::of(&key);

    // Group quads by material; BTreeMap keeps group order deterministic.
    let mut groups: BTreeMap<u32, GeometryGroup> = BTreeMap::new();
    for quad in &mesh.quads {
        let group = groups.entry(quad.material).or_insert_with(|| GeometryGroup {
            material_index: quad.material,
            ..Default::default()
        });
        let base = group.vertex_count() as u32;
        for i in 0..4 {
            group.positions.extend_from_slice(&quad.positions[i]);
            group.normals.extend_from_slice(&quad.normals[i]);
            group.uvs.extend_from_slice(&quad.uvs[i]);
        }
        group
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }

    let (occlusion_flags, full_faces) = face_coverage(mesh);

    PaletteEntry {
        key,
        category,
        occlusion_flags,
        groups: groups.into_values().collect(),
        full_faces,
    }
}

/// Compute per-face occlusion flags and full-face materials.
///
/// A face's bit is set iff it has at least one boundary-flush quad and
/// every such quad fully covers the unit square in that plane.
fn face_coverage(mesh: &BlockMesh) -> (u8, [Option<u32>; 6]) {
    let mut flags = 0u8;
    let mut full_faces = [None; 6];

    for dir in Direction::ALL {
        let normal = dir.normal();
        let axis = dir.axis().index();
        let plane = if dir.is_positive() { 1.0 } else { 0.0 };

        // Quads lying in this boundary plane with this normal.
        let boundary: Vec<_> = mesh
            .quads
            .iter()
            .filter(|quad| {
                let n = quad.normals[0];
                (0..3).all(|i| (n[i] - normal[i]).abs() < 1e-3)
                    && quad.positions.iter().all(|p| (p[axis] - plane).abs() < EPS)
            })
            .collect();

        if boundary.is_empty() {
            continue;
        }

        if boundary.iter().all(|quad| covers_unit_square(quad, axis)) {
            flags |= dir.mask();
            if let [quad] = boundary.as_slice() {
                full_faces[dir.bit() as usize] = Some(quad.material);
            }
        }
    }

    (flags, full_faces)
}

/// Check that a boundary quad spans [0, 1] on both in-plane axes.
fn covers_unit_square(quad: &crate::mesh::block::BlockQuad, plane_axis: usize) -> bool {
    for axis in 0..3 {
        if axis == plane_axis {
            continue;
        }
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for p in &quad.positions {
            min = min.min(p[axis]);
            max = max.max(p[axis]);
        }
        if min.abs() > EPS || (max - 1.0).abs() > EPS {
            return false;
        }
    }
    true
}

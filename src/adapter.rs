//! Scene adapter seam: merged buffers out, host mesh objects in.
//!
//! The compiler emits [`MergedMesh`] data through a [`SceneSink`]; the
//! [`SceneNode`] translation applies everything a host renderer needs to
//! undo quantization and order categories correctly.

use crate::chunk::{MergedMesh, PositionBuffer, POSITION_SCALE};
use crate::error::MeshError;
use crate::types::Category;

/// Identifier of a chunk within one build session (partition order).
pub type ChunkId = u64;

/// Receives mesh data as the build progresses. Chunk meshes arrive in no
/// particular order; each carries its own origin, so acceptance must be
/// commutative.
pub trait SceneSink {
    /// Zero or more calls per chunk, one per non-empty render category.
    fn on_chunk_mesh(&mut self, chunk_id: ChunkId, category: Category, mesh: MergedMesh);

    /// A chunk failed permanently (after retry). The build continues.
    fn on_chunk_failed(&mut self, chunk_id: ChunkId, error: &MeshError) {
        let _ = (chunk_id, error);
    }

    /// End of a build session.
    fn on_build_complete(&mut self, build_id: u64);
}

/// A renderer-agnostic mesh node description.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub mesh: MergedMesh,
    pub category: Category,
    /// Uniform node scale undoing position quantization.
    pub scale: f32,
    /// Node translation (the mesh origin).
    pub translation: [f32; 3],
    /// i8 normals are declared normalized; the host's vertex layout undoes
    /// the i8-to-f32 mapping.
    pub normals_normalized: bool,
    /// Draw order within the scene.
    pub render_order: i32,
    /// Whether alpha blending is required.
    pub transparent: bool,
    /// Fixed node opacity.
    pub opacity: f32,
    /// Tagged for per-frame updates (powered redstone repaints).
    pub dynamic: bool,
}

/// Translate a merged mesh into a scene node description.
pub fn scene_node(mesh: MergedMesh, category: Category) -> SceneNode {
    let scale = match mesh.positions {
        PositionBuffer::Quantized(_) => 1.0 / POSITION_SCALE,
        PositionBuffer::World(_) => 1.0,
    };
    let translation = mesh.origin;

    let (render_order, transparent, opacity, dynamic) = match category {
        Category::Solid => (0, false, 1.0, false),
        Category::Emissive => (1, false, 1.0, false),
        Category::Transparent => (2, true, 1.0, false),
        Category::Water => (3, true, 0.8, false),
        Category::Redstone => (0, false, 1.0, true),
    };

    SceneNode {
        mesh,
        category,
        scale,
        translation,
        normals_normalized: true,
        render_order,
        transparent,
        opacity,
        dynamic,
    }
}

/// A sink that collects everything in memory. Used by tests and the CLI.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub meshes: Vec<(ChunkId, Category, MergedMesh)>,
    pub failures: Vec<(ChunkId, String)>,
    pub completed_builds: Vec<u64>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_vertices(&self) -> usize {
        self.meshes.iter().map(|(_, _, m)| m.vertex_count()).sum()
    }

    pub fn total_triangles(&self) -> usize {
        self.meshes.iter().map(|(_, _, m)| m.triangle_count()).sum()
    }
}

impl SceneSink for CollectingSink {
    fn on_chunk_mesh(&mut self, chunk_id: ChunkId, category: Category, mesh: MergedMesh) {
        self.meshes.push((chunk_id, category, mesh));
    }

    fn on_chunk_failed(&mut self, chunk_id: ChunkId, error: &MeshError) {
        self.failures.push((chunk_id, error.to_string()));
    }

    fn on_build_complete(&mut self, build_id: u64) {
        self.completed_builds.push(build_id);
    }
}

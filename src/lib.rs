//! # Voxel Mesher
//!
//! A Rust library that compiles sparse voxel worlds into compact, GPU-ready
//! triangle meshes, partitioned by material and by spatial chunk, with
//! aggressive face culling to suppress hidden surfaces.
//!
//! ## Overview
//!
//! The compiler runs a four-stage pipeline:
//!
//! 1. **Content** — block states resolve to model holders
//!    ([`resolver::StateResolver`]), model inheritance flattens into
//!    normalized cuboid elements ([`resolver::ModelResolver`]), and faces
//!    resolve textures, tints, and UVs into interned materials
//!    ([`mesh::FaceProcessor`], [`MaterialRegistry`]).
//! 2. **Palette** — every distinct block in the schematic is pre-meshed
//!    once into a [`mesh::PaletteEntry`] with per-material geometry groups
//!    and occlusion flags ([`mesh::PaletteCompiler`]).
//! 3. **Chunks** — the world splits into axis-aligned chunks
//!    ([`chunk::partition`]); a worker pool ([`pool::WorkerPool`]) merges
//!    each chunk's blocks against a padded occupancy grid, culling faces
//!    hidden by neighbors and quantizing vertices ([`chunk::ChunkMesher`]).
//! 4. **Scene** — merged buffers stream to a [`SceneSink`]; [`scene_node`]
//!    describes the node transform that undoes quantization.
//!
//! ## Quick Start
//!
//! ```ignore
//! use voxel_mesher::{
//!     load_pack, BlockKey, BlockPosition, CollectingSink, CompilerConfig,
//!     MapSchematic, MeshCompiler,
//! };
//! use std::sync::Arc;
//!
//! let pack = load_pack("path/to/pack.zip")?;
//! let mut compiler = MeshCompiler::new(Arc::from(pack), CompilerConfig::default())?;
//!
//! let mut world = MapSchematic::new();
//! world.set_block(BlockPosition::new(0, 0, 0), BlockKey::new("minecraft:stone"));
//!
//! let mut sink = CollectingSink::new();
//! let report = compiler.build(&world, &mut sink)?;
//! println!("meshed {} chunks, {} errors", report.chunks_meshed, report.errors);
//! ```
//!
//! ## Render categories
//!
//! Merged buffers are grouped per chunk into five categories with fixed
//! draw order: solid (0), emissive (1), transparent (2), water (3, fixed
//! 0.8 opacity), and redstone (dynamic, repainted on power change).
//!
//! ## Delivery modes
//!
//! - **Incremental** — each chunk is delivered as soon as its worker
//!   returns; positions are i16, quantized by [`chunk::POSITION_SCALE`],
//!   with the chunk origin on the node transform.
//! - **Batched** — workers accumulate world-space f32 buffers and flush one
//!   large mesh per category at the end of the build (spatial extents
//!   beyond the i16 range are the reason batched output is unquantized).

pub mod adapter;
pub mod chunk;
pub mod compiler;
pub mod content;
pub mod error;
pub mod mesh;
pub mod pool;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod schematic;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

// --- Core types ---
pub use error::{ErrorCounts, ErrorKind, MeshError, Result};
pub use types::{Axis, BlockKey, BlockPosition, Category, Direction};

// --- Capabilities ---
pub use provider::{load_pack, DirectoryPack, MemoryPack, PackStack, ResourceProvider, ZipPack};
pub use schematic::{MapSchematic, Schematic};

// --- Compiler ---
pub use compiler::{BuildContext, BuildReport, CompilerConfig, MeshCompiler, MeshMode};

// --- Mesh data ---
pub use chunk::{Chunk, DrawGroup, IndexBuffer, MergedMesh, PositionBuffer, POSITION_SCALE};
pub use mesh::{Palette, PaletteEntry};
pub use registry::{MaterialInfo, MaterialKey, MaterialRegistry, TextureCache};

// --- Scene adapter ---
pub use adapter::{scene_node, ChunkId, CollectingSink, SceneNode, SceneSink};

//! Spatial pipeline: chunk partitioning, mesh merging, greedy merging.

pub mod greedy;
pub mod merge;
pub mod partition;

pub use merge::{
    ChunkMesher, DrawGroup, IndexBuffer, MergeMode, MergedMesh, PositionBuffer, NORMAL_SCALE,
    POSITION_SCALE,
};
pub use partition::{partition, Chunk, BLOCK_STRIDE};

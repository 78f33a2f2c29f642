//! Content-to-geometry pipeline: faces, blocks, occlusion, and the palette.

pub mod block;
pub mod face;
pub mod occlusion;
pub mod palette;

pub use block::{BlockMesh, BlockMeshBuilder, BlockQuad};
pub use face::{FaceProcessor, ProcessedFace, TintTable};
pub use occlusion::{OcclusionOracle, WorldRead};
pub use palette::{GeometryGroup, Palette, PaletteCompiler, PaletteEntry};

//! Block state and model resolution.
//!
//! [`StateResolver`] picks model holders for a block; [`ModelResolver`]
//! flattens model inheritance into concrete, normalized geometry.

pub mod model;
pub mod state;

pub use model::ModelResolver;
pub use state::StateResolver;

use crate::content::Model;
use crate::types::HolderTransform;
use std::sync::Arc;

/// A resolved model ready for meshing.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    /// The fully resolved model (inherited textures and elements merged,
    /// coordinates normalized).
    pub model: Arc<Model>,
    /// Holder-level transform (x/y/z rotation, uv lock).
    pub transform: HolderTransform,
}

//! Content-layer types: block-state definitions and block models.
//!
//! Everything here is a lenient decoding of arbitrary pack JSON; malformed
//! or missing pieces degrade to sentinels rather than failing a build.

pub mod blockstate;
pub mod model;

pub use blockstate::{
    ApplyValue, BlockStateDefinition, ModelHolder, MultipartCase, MultipartCondition,
    PropertyFilter,
};
pub use model::{Element, Face, Model, MISSING_TEXTURE};

//! Block model parsing and normalization.
//!
//! Models define block geometry as cuboid elements with up to six textured
//! faces. Content JSON uses [0, 16] voxel units; the model resolver
//! normalizes everything into block-local [0, 1] space.

use crate::types::{Direction, ElementRotation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed block model from `models/*.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    /// Parent model to inherit from.
    #[serde(default)]
    pub parent: Option<String>,

    /// Whether to use ambient occlusion.
    #[serde(default = "default_ao", rename = "ambientocclusion")]
    pub ambient_occlusion: bool,

    /// Texture variable definitions.
    #[serde(default)]
    pub textures: HashMap<String, String>,

    /// Model elements (cuboids). An empty list means "not defined here";
    /// inheritance fills it from the nearest ancestor that defines one.
    #[serde(default)]
    pub elements: Vec<Element>,

    /// Fields this pipeline does not interpret (display transforms, GUI
    /// light, overrides). Preserved so nothing is lost on re-serialization.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_ao() -> bool {
    true
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if this model defines its own elements.
    pub fn has_elements(&self) -> bool {
        !self.elements.is_empty()
    }

    /// Divide all element coordinates by 16, bringing them into [0, 1].
    pub fn normalize(&mut self) {
        for element in &mut self.elements {
            element.normalize();
        }
    }

    /// Walk a `#ref` chain through the texture map, capped at depth 5.
    /// Overflow and missing keys resolve to the `missing_texture` sentinel.
    pub fn resolve_texture(&self, reference: &str) -> String {
        let mut current = reference;
        for _ in 0..5 {
            if !current.starts_with('#') {
                return current.to_string();
            }
            match self.textures.get(&current[1..]) {
                Some(next) => current = next,
                None => return MISSING_TEXTURE.to_string(),
            }
        }
        if current.starts_with('#') {
            MISSING_TEXTURE.to_string()
        } else {
            current.to_string()
        }
    }
}

/// Sentinel texture path substituted for anything unresolvable.
pub const MISSING_TEXTURE: &str = "missing_texture";

/// A cuboid element within a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// Minimum corner.
    pub from: [f32; 3],
    /// Maximum corner.
    pub to: [f32; 3],
    /// Optional rotation about an arbitrary origin.
    #[serde(default)]
    pub rotation: Option<ElementRotation>,
    /// Whether this element receives shade.
    #[serde(default = "default_shade")]
    pub shade: bool,
    /// Face definitions. Values may be null in hand-written content.
    #[serde(default)]
    pub faces: HashMap<Direction, Option<Face>>,
}

fn default_shade() -> bool {
    true
}

impl Element {
    /// Divide coordinates (and the rotation origin) by 16.
    ///
    /// Idempotence is not assumed; callers normalize exactly once, at model
    /// resolution time.
    pub fn normalize(&mut self) {
        for i in 0..3 {
            self.from[i] /= 16.0;
            self.to[i] /= 16.0;
        }
        if let Some(rotation) = &mut self.rotation {
            for i in 0..3 {
                rotation.origin[i] /= 16.0;
            }
        }
    }

    /// Get the face definition for a direction, flattening the null case.
    pub fn face(&self, direction: Direction) -> Option<&Face> {
        self.faces.get(&direction).and_then(|f| f.as_ref())
    }
}

/// A face of a model element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    /// UV rectangle `[u0, v0, u1, v1]` in [0, 16] texture units.
    #[serde(default)]
    pub uv: Option<[f32; 4]>,
    /// Texture reference: `#name`, a direct path, or the missing sentinel.
    #[serde(default = "default_texture")]
    pub texture: String,
    /// Neighbor-facing cull hint. Kept as a raw string; real content uses
    /// loose spellings ("bottom") that must not fail the whole model.
    #[serde(default)]
    pub cullface: Option<String>,
    /// UV rotation in degrees (0, 90, 180, 270).
    #[serde(default)]
    pub rotation: i32,
    /// Tint index. Negative means untinted.
    #[serde(default = "default_tint_index")]
    pub tintindex: i32,
}

fn default_texture() -> String {
    MISSING_TEXTURE.to_string()
}

fn default_tint_index() -> i32 {
    -1
}

impl Face {
    /// Parse the cullface hint, tolerating legacy spellings.
    pub fn cullface_direction(&self) -> Option<Direction> {
        match self.cullface.as_deref() {
            Some("bottom") => Some(Direction::Down),
            Some("top") => Some(Direction::Up),
            Some(name) => Direction::from_name(name),
            None => None,
        }
    }

    /// Whether this face participates in tinting.
    pub fn has_tint(&self) -> bool {
        self.tintindex >= 0
    }

    /// UV rectangle in [0, 1], auto-projected from the normalized element
    /// bounds when unspecified. For a full cube this is the full square.
    pub fn normalized_uv(&self, direction: Direction, from: &[f32; 3], to: &[f32; 3]) -> [f32; 4] {
        if let Some(uv) = self.uv {
            return [uv[0] / 16.0, uv[1] / 16.0, uv[2] / 16.0, uv[3] / 16.0];
        }
        // Project element bounds onto the face plane. Inputs are already
        // normalized to [0, 1].
        match direction {
            Direction::Down => [from[0], 1.0 - to[2], to[0], 1.0 - from[2]],
            Direction::Up => [from[0], from[2], to[0], to[2]],
            Direction::North => [1.0 - to[0], 1.0 - to[1], 1.0 - from[0], 1.0 - from[1]],
            Direction::South => [from[0], 1.0 - to[1], to[0], 1.0 - from[1]],
            Direction::West => [from[2], 1.0 - to[1], to[2], 1.0 - from[1]],
            Direction::East => [1.0 - to[2], 1.0 - to[1], 1.0 - from[2], 1.0 - from[1]],
        }
    }
}

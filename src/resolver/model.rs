//! Model inheritance resolution.
//!
//! Models form a DAG via `parent`. Resolution is iterative with a visited
//! set and a hard depth cap; the merge is child-wins except `textures`
//! (shallow parent-then-child merge) and `elements` (taken from the nearest
//! descendant that defines any).

use crate::content::{Element, Face, Model};
use crate::error::{MeshError, Result};
use crate::provider::ResourceProvider;
use crate::types::{BlockKey, Direction};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::debug;

/// Maximum parent-chain depth.
const MAX_INHERITANCE_DEPTH: usize = 5;

/// Resolves model inheritance chains and caches the results.
pub struct ModelResolver<'a> {
    provider: &'a dyn ResourceProvider,
    cache: RefCell<FxHashMap<String, Arc<Model>>>,
}

impl<'a> ModelResolver<'a> {
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self {
            provider,
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Resolve a model reference into a merged, normalized model.
    ///
    /// Block properties feed the built-in override shim (chest halves pick
    /// their shape from the `type` property). Cycles and over-deep chains
    /// surface as errors; callers recover by treating the model as empty.
    pub fn resolve(&self, model_ref: &str, block: &BlockKey) -> Result<Arc<Model>> {
        let reference = strip_namespace(model_ref);

        if let Some(cached) = self.cache.borrow().get(reference) {
            return Ok(cached.clone());
        }

        if let Some(mut override_model) = builtin_override(reference, block) {
            override_model.normalize();
            // Overrides depend on properties; don't cache under the bare ref.
            return Ok(Arc::new(override_model));
        }

        let resolved = self.resolve_chain(reference)?;
        let resolved = Arc::new(resolved);
        self.cache
            .borrow_mut()
            .insert(reference.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Walk the parent chain iteratively and merge top-down.
    fn resolve_chain(&self, reference: &str) -> Result<Model> {
        let mut chain: Vec<Model> = Vec::new();
        let mut visited: FxHashSet<String> = FxHashSet::default();

        let mut current_ref = reference.to_string();
        loop {
            if !visited.insert(current_ref.clone()) {
                return Err(MeshError::ModelCycle(reference.to_string()));
            }
            if chain.len() >= MAX_INHERITANCE_DEPTH {
                return Err(MeshError::ModelDepthExceeded(reference.to_string()));
            }

            let model = match self.load_raw(&current_ref) {
                Some(model) => model,
                None if chain.is_empty() => {
                    // A missing model is not fatal; it is simply empty.
                    debug!(model = %current_ref, "model resource missing, treating as empty");
                    Model::new()
                }
                None => {
                    // Missing ancestor: terminate the chain with what we have.
                    debug!(model = %current_ref, "parent model missing, ending chain");
                    break;
                }
            };

            let parent = model.parent.clone();
            chain.push(model);

            match parent {
                Some(parent_ref) if !parent_ref.starts_with("builtin/") => {
                    current_ref = strip_namespace(&parent_ref).to_string();
                }
                _ => break,
            }
        }

        // Merge from the root ancestor down to the requested model.
        let mut merged = chain.pop().unwrap_or_default();
        while let Some(child) = chain.pop() {
            merged = merge_models(merged, child);
        }
        merged.parent = None;
        merged.normalize();
        Ok(merged)
    }

    /// Load and parse one model JSON without resolving inheritance.
    fn load_raw(&self, reference: &str) -> Option<Model> {
        let path = format!("models/{}.json", reference);
        let text = self.provider.read_string(&path)?;
        match serde_json::from_str::<Model>(&text) {
            Ok(model) => Some(model),
            Err(e) => {
                debug!(model = reference, error = %e, "failed to parse model");
                None
            }
        }
    }
}

/// Merge a child model over its (already merged) parent.
fn merge_models(parent: Model, child: Model) -> Model {
    let mut merged = parent;

    // Textures merge shallowly: parent entries survive unless overridden.
    for (key, value) in child.textures {
        merged.textures.insert(key, value);
    }

    // Elements come from the nearest descendant that defines any.
    if !child.elements.is_empty() {
        merged.elements = child.elements;
    }

    merged.ambient_occlusion = child.ambient_occlusion;

    // Unknown fields: child wins per key.
    for (key, value) in child.extra {
        merged.extra.insert(key, value);
    }

    merged.parent = child.parent;
    merged
}

/// Strip the default namespace prefix from a resource reference.
fn strip_namespace(reference: &str) -> &str {
    reference.strip_prefix("minecraft:").unwrap_or(reference)
}

/// Built-in overrides for block-entity models the content pipeline cannot
/// express: their blockstate models descend from `builtin/entity` and carry
/// no elements, so a stand-in cuboid is substituted.
fn builtin_override(reference: &str, block: &BlockKey) -> Option<Model> {
    let name = reference.strip_prefix("block/")?;

    if name == "chest" || name == "trapped_chest" {
        let texture = if name == "trapped_chest" {
            "entity/chest/trapped"
        } else {
            "entity/chest/normal"
        };
        // Double chests widen toward the partner half.
        let (from, to) = match block.property("type") {
            Some("left") => ([1.0, 0.0, 1.0], [16.0, 14.0, 15.0]),
            Some("right") => ([0.0, 0.0, 1.0], [15.0, 14.0, 15.0]),
            _ => ([1.0, 0.0, 1.0], [15.0, 14.0, 15.0]),
        };
        return Some(cuboid_model(from, to, texture));
    }

    if name == "ender_chest" {
        return Some(cuboid_model(
            [1.0, 0.0, 1.0],
            [15.0, 14.0, 15.0],
            "entity/chest/ender",
        ));
    }

    if name == "shulker_box" || name.ends_with("_shulker_box") {
        let color = name.strip_suffix("_shulker_box").unwrap_or("shulker");
        let texture = if name == "shulker_box" {
            "entity/shulker/shulker".to_string()
        } else {
            format!("entity/shulker/shulker_{}", color)
        };
        let mut model = cuboid_model([0.0, 0.0, 0.0], [16.0, 16.0, 16.0], &texture);
        model.textures.insert("particle".to_string(), texture);
        return Some(model);
    }

    None
}

/// Build a six-faced cuboid model in [0, 16] units with a direct texture
/// path on every face.
fn cuboid_model(from: [f32; 3], to: [f32; 3], texture: &str) -> Model {
    let faces = Direction::ALL
        .iter()
        .map(|dir| {
            (
                *dir,
                Some(Face {
                    uv: None,
                    texture: texture.to_string(),
                    cullface: None,
                    rotation: 0,
                    tintindex: -1,
                }),
            )
        })
        .collect();

    Model {
        parent: None,
        ambient_occlusion: true,
        textures: std::collections::HashMap::new(),
        elements: vec![Element {
            from,
            to,
            rotation: None,
            shade: true,
            faces,
        }],
        extra: serde_json::Map::new(),
    }
}

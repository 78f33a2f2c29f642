//! Block state to model holder resolution.

use crate::content::{BlockStateDefinition, ModelHolder};
use crate::error::{MeshError, Result};
use crate::provider::ResourceProvider;
use crate::types::BlockKey;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::debug;

/// Resolves block states to model holders.
pub struct StateResolver<'a> {
    provider: &'a dyn ResourceProvider,
    cache: RefCell<FxHashMap<String, Option<Arc<BlockStateDefinition>>>>,
}

impl<'a> StateResolver<'a> {
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self {
            provider,
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Resolve a block to its model holders: one per matched multipart case
    /// entry, or one per variant slot.
    pub fn resolve(&self, block: &BlockKey) -> Result<Vec<ModelHolder>> {
        let id = block.id().to_string();

        let definition = self
            .definition(&id)
            .ok_or_else(|| MeshError::NoModel(block.name.clone()))?;

        let holders = match definition.as_ref() {
            BlockStateDefinition::Variants(variants) => {
                self.resolve_variants(variants, block)
            }
            BlockStateDefinition::Multipart(cases) => {
                let mut holders = Vec::new();
                for case in cases {
                    let applies = match &case.when {
                        Some(condition) => condition.matches(&block.properties),
                        None => true,
                    };
                    if applies {
                        holders.extend(case.apply.holders().iter().cloned());
                    }
                }
                holders
            }
        };

        if holders.is_empty() {
            debug!(block = %block.name, "block state yielded no holders");
            return Err(MeshError::NoModel(block.name.clone()));
        }
        Ok(holders)
    }

    /// Load and cache the parsed block-state definition for a block id.
    fn definition(&self, id: &str) -> Option<Arc<BlockStateDefinition>> {
        if let Some(cached) = self.cache.borrow().get(id) {
            return cached.clone();
        }

        let path = format!("blockstates/{}.json", id);
        let parsed = self.provider.read_string(&path).and_then(|text| {
            match serde_json::from_str::<BlockStateDefinition>(&text) {
                Ok(def) => Some(Arc::new(def)),
                Err(e) => {
                    debug!(block = id, error = %e, "failed to parse block state");
                    None
                }
            }
        });

        self.cache.borrow_mut().insert(id.to_string(), parsed.clone());
        parsed
    }

    /// Resolve using the variants format.
    fn resolve_variants(
        &self,
        variants: &std::collections::HashMap<String, Vec<ModelHolder>>,
        block: &BlockKey,
    ) -> Vec<ModelHolder> {
        let selector = canonical_selector(variants, block);

        let slot = variants
            .get(&selector)
            .or_else(|| variants.get(""));

        match slot {
            Some(slot) if !slot.is_empty() => vec![pick_weighted(slot, block.fingerprint())],
            _ => Vec::new(),
        }
    }
}

/// Compute the canonical variant-selector string for a block.
///
/// The selector keys are the property names referenced by the
/// lexicographically first variant key; the block's own values fill them in,
/// sorted and joined as `key=value` with commas. Properties the variant
/// keys never mention (e.g. `waterlogged`) drop out of the lookup.
fn canonical_selector(
    variants: &std::collections::HashMap<String, Vec<ModelHolder>>,
    block: &BlockKey,
) -> String {
    let mut keys: Vec<&String> = variants.keys().collect();
    keys.sort();
    let Some(first) = keys.first() else {
        return String::new();
    };

    let mut referenced: Vec<&str> = first
        .split(',')
        .filter_map(|pair| pair.split_once('=').map(|(k, _)| k))
        .collect();
    referenced.sort_unstable();

    referenced
        .into_iter()
        .filter_map(|key| {
            block
                .property(key)
                .map(|value| format!("{}={}", key, value))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Deterministic weighted pick seeded by the block fingerprint, so the same
/// block always renders the same holder across builds.
fn pick_weighted(slot: &[ModelHolder], fingerprint: u64) -> ModelHolder {
    let total: u64 = slot.iter().map(|h| h.weight() as u64).sum();
    let mut roll = fingerprint % total.max(1);
    for holder in slot {
        let weight = holder.weight() as u64;
        if roll < weight {
            return holder.clone();
        }
        roll -= weight;
    }
    slot[slot.len() - 1].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryPack;

    fn pack_with(states: &[(&str, &str)]) -> MemoryPack {
        let mut pack = MemoryPack::new();
        for (id, json) in states {
            pack.insert_text(format!("blockstates/{}.json", id), json);
        }
        pack
    }

    #[test]
    fn test_resolve_simple_block() {
        let pack = pack_with(&[(
            "stone",
            r#"{ "variants": { "": { "model": "block/stone" } } }"#,
        )]);
        let resolver = StateResolver::new(&pack);

        let holders = resolver.resolve(&BlockKey::new("minecraft:stone")).unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].model, "block/stone");
    }

    #[test]
    fn test_resolve_directional_block() {
        let pack = pack_with(&[(
            "furnace",
            r#"{ "variants": {
                "facing=north": { "model": "block/furnace" },
                "facing=east": { "model": "block/furnace", "y": 90 },
                "facing=south": { "model": "block/furnace", "y": 180 },
                "facing=west": { "model": "block/furnace", "y": 270 }
            } }"#,
        )]);
        let resolver = StateResolver::new(&pack);

        let block = BlockKey::new("minecraft:furnace").with_property("facing", "east");
        let holders = resolver.resolve(&block).unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].y, 90);
    }

    #[test]
    fn test_selector_drops_unreferenced_properties() {
        // Slab variant keys never mention waterlogged; the lookup must not
        // be poisoned by it.
        let pack = pack_with(&[(
            "stone_slab",
            r#"{ "variants": {
                "type=bottom": { "model": "block/stone_slab" },
                "type=double": { "model": "block/stone" },
                "type=top": { "model": "block/stone_slab_top" }
            } }"#,
        )]);
        let resolver = StateResolver::new(&pack);

        let block = BlockKey::new("minecraft:stone_slab")
            .with_property("type", "top")
            .with_property("waterlogged", "false");
        let holders = resolver.resolve(&block).unwrap();
        assert_eq!(holders[0].model, "block/stone_slab_top");
    }

    #[test]
    fn test_multipart_appends_matches() {
        let pack = pack_with(&[(
            "oak_fence",
            r#"{ "multipart": [
                { "apply": { "model": "block/fence_post" } },
                { "when": { "north": "true" }, "apply": { "model": "block/fence_side" } },
                { "when": { "east": "true" }, "apply": { "model": "block/fence_side", "y": 90 } },
                { "when": { "south": "true" }, "apply": { "model": "block/fence_side", "y": 180 } },
                { "when": { "west": "true" }, "apply": { "model": "block/fence_side", "y": 270 } }
            ] }"#,
        )]);
        let resolver = StateResolver::new(&pack);

        let block = BlockKey::new("minecraft:oak_fence")
            .with_property("north", "true")
            .with_property("east", "true")
            .with_property("south", "false")
            .with_property("west", "false");
        let holders = resolver.resolve(&block).unwrap();

        // Post plus exactly the north and east sides.
        assert_eq!(holders.len(), 3);
        assert_eq!(holders[0].model, "block/fence_post");
        assert_eq!(holders[1].y, 0);
        assert_eq!(holders[2].y, 90);
    }

    #[test]
    fn test_missing_blockstate_is_no_model() {
        let pack = pack_with(&[]);
        let resolver = StateResolver::new(&pack);
        let err = resolver.resolve(&BlockKey::new("minecraft:mystery")).unwrap_err();
        assert!(matches!(err, MeshError::NoModel(_)));
    }

    #[test]
    fn test_weighted_pick_is_deterministic() {
        let pack = pack_with(&[(
            "mossy_cobblestone",
            r#"{ "variants": { "": [
                { "model": "block/mossy_a", "weight": 3 },
                { "model": "block/mossy_b", "weight": 1 }
            ] } }"#,
        )]);
        let resolver = StateResolver::new(&pack);
        let block = BlockKey::new("minecraft:mossy_cobblestone");

        let first = resolver.resolve(&block).unwrap();
        for _ in 0..16 {
            let again = resolver.resolve(&block).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_weighted_pick_covers_all_weights() {
        // Every holder must be reachable by some fingerprint.
        let slot = vec![
            ModelHolder::new("a"),
            ModelHolder::new("b"),
            ModelHolder::new("c"),
        ];
        let picks: std::collections::HashSet<String> =
            (0..3u64).map(|seed| pick_weighted(&slot, seed).model).collect();
        assert_eq!(picks.len(), 3);
    }
}

//! Block-state definition parsing.
//!
//! Block states map property combinations to model holders. Two formats
//! exist: "variants" (selector string to holder list) and "multipart"
//! (conditional holder application).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A block-state definition from `blockstates/*.json`.
#[derive(Debug, Clone)]
pub enum BlockStateDefinition {
    /// Property selector string to one or more weighted holders.
    Variants(HashMap<String, Vec<ModelHolder>>),
    /// Conditional model application.
    Multipart(Vec<MultipartCase>),
}

impl<'de> Deserialize<'de> for BlockStateDefinition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawBlockState {
            variants: Option<HashMap<String, HolderValue>>,
            multipart: Option<Vec<MultipartCase>>,
        }

        let raw = RawBlockState::deserialize(deserializer)?;

        if let Some(variants) = raw.variants {
            let parsed = variants
                .into_iter()
                .map(|(k, v)| (k, v.into_vec()))
                .collect();
            Ok(BlockStateDefinition::Variants(parsed))
        } else if let Some(multipart) = raw.multipart {
            Ok(BlockStateDefinition::Multipart(multipart))
        } else {
            Ok(BlockStateDefinition::Variants(HashMap::new()))
        }
    }
}

/// A holder value can be a single holder or a weighted list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum HolderValue {
    Single(ModelHolder),
    Multiple(Vec<ModelHolder>),
}

impl HolderValue {
    fn into_vec(self) -> Vec<ModelHolder> {
        match self {
            HolderValue::Single(v) => vec![v],
            HolderValue::Multiple(v) => v,
        }
    }
}

/// A model reference with rotation and selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHolder {
    /// Model resource location (e.g. "block/stone").
    pub model: String,
    /// X rotation in degrees (0, 90, 180, 270).
    #[serde(default)]
    pub x: i32,
    /// Y rotation in degrees (0, 90, 180, 270).
    #[serde(default)]
    pub y: i32,
    /// Z rotation in degrees (0, 90, 180, 270).
    #[serde(default)]
    pub z: i32,
    /// If true, UV coordinates don't rotate with the block.
    #[serde(default, rename = "uvlock")]
    pub uv_lock: bool,
    /// Weight for deterministic selection. Defaults to 1; values below 1
    /// are forbidden and clamp to 1.
    #[serde(default = "default_weight")]
    weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl ModelHolder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            x: 0,
            y: 0,
            z: 0,
            uv_lock: false,
            weight: 1,
        }
    }

    /// Selection weight, never below 1.
    pub fn weight(&self) -> u32 {
        self.weight.max(1)
    }
}

/// A multipart case with an optional condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipartCase {
    /// Condition for when this case applies. Absent means always.
    #[serde(default)]
    pub when: Option<MultipartCondition>,
    /// Holder(s) to apply when the condition is met.
    pub apply: ApplyValue,
}

/// The apply value can be a single holder or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApplyValue {
    Single(ModelHolder),
    Multiple(Vec<ModelHolder>),
}

impl ApplyValue {
    pub fn holders(&self) -> &[ModelHolder] {
        match self {
            ApplyValue::Single(v) => std::slice::from_ref(v),
            ApplyValue::Multiple(v) => v,
        }
    }
}

/// Multipart condition for when a case applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultipartCondition {
    /// Any of the sub-filters must match.
    #[allow(non_snake_case)]
    Or { OR: Vec<PropertyFilter> },
    /// All of the sub-filters must match.
    #[allow(non_snake_case)]
    And { AND: Vec<PropertyFilter> },
    /// All predicates of the filter must match.
    Simple(PropertyFilter),
}

impl MultipartCondition {
    /// Check the condition against a block's property map.
    pub fn matches(&self, properties: &BTreeMap<String, String>) -> bool {
        match self {
            MultipartCondition::Or { OR } => OR.iter().any(|f| f.matches(properties)),
            MultipartCondition::And { AND } => AND.iter().all(|f| f.matches(properties)),
            MultipartCondition::Simple(filter) => filter.matches(properties),
        }
    }
}

/// A property predicate map. JSON values may be strings, booleans, or
/// numbers; all are canonicalized to strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyFilter(pub BTreeMap<String, String>);

impl<'de> Deserialize<'de> for PropertyFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: BTreeMap<String, serde_json::Value> = BTreeMap::deserialize(deserializer)?;
        Ok(PropertyFilter(
            raw.into_iter().map(|(k, v)| (k, value_to_string(&v))).collect(),
        ))
    }
}

impl PropertyFilter {
    /// All predicates must hold.
    pub fn matches(&self, properties: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|(key, expected)| {
            properties
                .get(key)
                .map(|actual| predicate_matches(expected, actual))
                .unwrap_or(false)
        })
    }
}

/// Evaluate one `property=value` predicate.
///
/// Numeric equality applies when both sides parse as numbers; otherwise the
/// expected value is a `|`-separated membership set.
pub fn predicate_matches(expected: &str, actual: &str) -> bool {
    if let (Ok(a), Ok(b)) = (expected.parse::<f64>(), actual.parse::<f64>()) {
        return a == b;
    }
    expected.split('|').any(|candidate| candidate == actual)
}

/// Canonicalize a JSON scalar to the string form used by property maps.
fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

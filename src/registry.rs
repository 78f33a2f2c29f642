//! Material registry and lazy texture cache.
//!
//! Materials are deduplicated by `(texture, tint, uv rotation)` and assigned
//! dense indices that stay stable for the whole build session. The registry
//! lives on the coordinator; workers only ever see material indices.

use crate::content::MISSING_TEXTURE;
use crate::provider::ResourceProvider;
use crate::types::Category;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// Deduplication key for a material.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    /// Resolved texture path (no `#` references).
    pub texture: String,
    /// Tint color, quantized to 8 bits per channel. White means untinted.
    pub tint: [u8; 3],
    /// UV rotation in degrees, normalized to {0, 90, 180, 270}.
    pub rotation: u16,
}

impl MaterialKey {
    pub fn new(texture: impl Into<String>, tint: [u8; 3], rotation: u16) -> Self {
        Self {
            texture: texture.into(),
            tint,
            rotation: rotation % 360,
        }
    }

    /// Untinted material with no rotation.
    pub fn plain(texture: impl Into<String>) -> Self {
        Self::new(texture, [255, 255, 255], 0)
    }
}

/// Everything the scene adapter needs to realize a material.
#[derive(Debug, Clone)]
pub struct MaterialInfo {
    pub key: MaterialKey,
    pub category: Category,
}

#[derive(Default)]
struct RegistryInner {
    materials: Vec<MaterialInfo>,
    index_of: FxHashMap<MaterialKey, u32>,
}

/// Thread-safe, append-only material registry.
#[derive(Default)]
pub struct MaterialRegistry {
    inner: RwLock<RegistryInner>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the dense index for a material. The category of the
    /// first interning wins; materials are never mutated afterwards.
    pub fn intern(&self, key: MaterialKey, category: Category) -> u32 {
        if let Some(index) = self.inner.read().unwrap().index_of.get(&key) {
            return *index;
        }

        let mut inner = self.inner.write().unwrap();
        // Racing interners may have inserted between the locks.
        if let Some(index) = inner.index_of.get(&key) {
            return *index;
        }
        let index = inner.materials.len() as u32;
        inner.index_of.insert(key.clone(), index);
        inner.materials.push(MaterialInfo { key, category });
        index
    }

    /// Look up a material by index.
    pub fn get(&self, index: u32) -> Option<MaterialInfo> {
        self.inner
            .read()
            .unwrap()
            .materials
            .get(index as usize)
            .cloned()
    }

    /// Number of distinct materials.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all materials in index order.
    pub fn snapshot(&self) -> Vec<MaterialInfo> {
        self.inner.read().unwrap().materials.clone()
    }
}

/// A decoded RGBA texture.
#[derive(Debug, Clone)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixel data, row-major.
    pub pixels: Vec<u8>,
}

impl DecodedTexture {
    /// The substitute texture: a 16x16 magenta/black checkerboard.
    fn missing() -> Self {
        let mut pixels = Vec::with_capacity(16 * 16 * 4);
        for y in 0..16u32 {
            for x in 0..16u32 {
                let magenta = (x / 8 + y / 8) % 2 == 0;
                if magenta {
                    pixels.extend_from_slice(&[255, 0, 255, 255]);
                } else {
                    pixels.extend_from_slice(&[0, 0, 0, 255]);
                }
            }
        }
        Self {
            width: 16,
            height: 16,
            pixels,
        }
    }
}

/// Coordinator-side texture decode cache, keyed by normalized texture path.
///
/// Texture bytes are resolved lazily through the resource provider; each
/// path is decoded at most once per build session.
pub struct TextureCache {
    provider: Arc<dyn ResourceProvider>,
    cache: Mutex<FxHashMap<String, Arc<DecodedTexture>>>,
}

impl TextureCache {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self {
            provider,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Decode the texture at `path` (e.g. "block/stone"), substituting the
    /// missing-texture checkerboard when the resource is absent or broken.
    pub fn get(&self, path: &str) -> Arc<DecodedTexture> {
        if let Some(cached) = self.cache.lock().unwrap().get(path) {
            return cached.clone();
        }

        let decoded = Arc::new(self.decode(path));
        self.cache
            .lock()
            .unwrap()
            .insert(path.to_string(), decoded.clone());
        decoded
    }

    fn decode(&self, path: &str) -> DecodedTexture {
        if path == MISSING_TEXTURE {
            return DecodedTexture::missing();
        }

        let resource = format!("textures/{}.png", path);
        let Some(bytes) = self.provider.read_binary(&resource) else {
            debug!(texture = path, "texture missing, substituting checkerboard");
            return DecodedTexture::missing();
        };

        match image::load_from_memory_with_format(&bytes, image::ImageFormat::Png) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                DecodedTexture {
                    width: rgba.width(),
                    height: rgba.height(),
                    pixels: rgba.into_raw(),
                }
            }
            Err(e) => {
                debug!(texture = path, error = %e, "texture decode failed");
                DecodedTexture::missing()
            }
        }
    }
}

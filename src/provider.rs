//! Resource provider capability and concrete pack implementations.
//!
//! The compiler never touches archives directly; it reads JSON text and
//! texture bytes through [`ResourceProvider`]. Paths are namespace-less and
//! relative to the pack's asset root, e.g. `blockstates/stone.json`,
//! `models/block/stone.json`, `textures/block/stone.png`.

use crate::error::Result;
use rustc_hash::FxHashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Read-only access to pack resources.
pub trait ResourceProvider: Send + Sync {
    /// Read a UTF-8 text resource (block states, models). `None` if absent.
    fn read_string(&self, path: &str) -> Option<String>;

    /// Read a binary resource (textures). `None` if absent.
    fn read_binary(&self, path: &str) -> Option<Vec<u8>>;
}

/// A stack of packs iterated from highest priority to lowest; the first hit
/// wins.
#[derive(Default)]
pub struct PackStack {
    packs: Vec<Box<dyn ResourceProvider>>,
}

impl PackStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a pack below all currently registered packs.
    pub fn push(&mut self, pack: Box<dyn ResourceProvider>) {
        self.packs.push(pack);
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}

impl ResourceProvider for PackStack {
    fn read_string(&self, path: &str) -> Option<String> {
        self.packs.iter().find_map(|p| p.read_string(path))
    }

    fn read_binary(&self, path: &str) -> Option<Vec<u8>> {
        self.packs.iter().find_map(|p| p.read_binary(path))
    }
}

/// The asset prefix all concrete packs resolve under.
const ASSET_ROOT: &str = "assets/minecraft/";

/// A pack backed by an in-memory map. Used by tests and embedded content.
#[derive(Default)]
pub struct MemoryPack {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemoryPack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.files.insert(path.into(), data);
    }

    pub fn insert_text(&mut self, path: impl Into<String>, text: &str) {
        self.files.insert(path.into(), text.as_bytes().to_vec());
    }
}

impl ResourceProvider for MemoryPack {
    fn read_string(&self, path: &str) -> Option<String> {
        self.files
            .get(path)
            .and_then(|data| String::from_utf8(data.clone()).ok())
    }

    fn read_binary(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }
}

/// A pack loaded from a ZIP archive. All entries under `assets/minecraft/`
/// are inflated up front so reads are lock-free map lookups.
pub struct ZipPack {
    files: FxHashMap<String, Vec<u8>>,
}

impl ZipPack {
    /// Load from ZIP bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let cursor = std::io::Cursor::new(data);
        let mut archive = zip::ZipArchive::new(cursor)?;

        let mut files = FxHashMap::default();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let Some(relative) = name.strip_prefix(ASSET_ROOT) else {
                continue;
            };
            let relative = relative.to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            if let Err(e) = entry.read_to_end(&mut data) {
                warn!(entry = %name, error = %e, "skipping unreadable pack entry");
                continue;
            }
            files.insert(relative, data);
        }

        Ok(Self { files })
    }

    /// Load from a ZIP file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }
}

impl ResourceProvider for ZipPack {
    fn read_string(&self, path: &str) -> Option<String> {
        self.files
            .get(path)
            .and_then(|data| String::from_utf8(data.clone()).ok())
    }

    fn read_binary(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }
}

/// A pack backed by an extracted directory with the standard
/// `assets/minecraft/` layout.
pub struct DirectoryPack {
    root: PathBuf,
}

impl DirectoryPack {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        // Reject traversal out of the pack.
        if path.contains("..") {
            return None;
        }
        let full = self.root.join(ASSET_ROOT).join(path);
        full.is_file().then_some(full)
    }
}

impl ResourceProvider for DirectoryPack {
    fn read_string(&self, path: &str) -> Option<String> {
        let full = self.resolve(path)?;
        std::fs::read_to_string(full).ok()
    }

    fn read_binary(&self, path: &str) -> Option<Vec<u8>> {
        let full = self.resolve(path)?;
        std::fs::read(full).ok()
    }
}

/// Load a pack from a path: ZIP file or extracted directory.
pub fn load_pack(path: impl AsRef<Path>) -> Result<Box<dyn ResourceProvider>> {
    let path = path.as_ref();
    if path.is_dir() {
        Ok(Box::new(DirectoryPack::new(path)))
    } else {
        Ok(Box::new(ZipPack::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_pack_roundtrip() {
        let mut pack = MemoryPack::new();
        pack.insert_text("models/block/stone.json", "{}");
        assert_eq!(
            pack.read_string("models/block/stone.json").as_deref(),
            Some("{}")
        );
        assert_eq!(pack.read_string("models/block/dirt.json"), None);
    }

    #[test]
    fn test_stack_priority_order() {
        let mut high = MemoryPack::new();
        high.insert_text("models/block/stone.json", "high");
        let mut low = MemoryPack::new();
        low.insert_text("models/block/stone.json", "low");
        low.insert_text("models/block/dirt.json", "dirt");

        let mut stack = PackStack::new();
        stack.push(Box::new(high));
        stack.push(Box::new(low));

        // First hit wins; fall through for entries only the lower pack has.
        assert_eq!(
            stack.read_string("models/block/stone.json").as_deref(),
            Some("high")
        );
        assert_eq!(
            stack.read_string("models/block/dirt.json").as_deref(),
            Some("dirt")
        );
    }

    #[test]
    fn test_zip_pack() {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            writer
                .start_file("assets/minecraft/blockstates/stone.json", options)
                .unwrap();
            writer.write_all(b"{\"variants\":{}}").unwrap();
            writer.start_file("pack.mcmeta", options).unwrap();
            writer.write_all(b"{}").unwrap();
            writer.finish().unwrap();
        }

        let pack = ZipPack::from_bytes(&buf).unwrap();
        assert_eq!(
            pack.read_string("blockstates/stone.json").as_deref(),
            Some("{\"variants\":{}}")
        );
        // Entries outside assets/minecraft/ are not exposed.
        assert_eq!(pack.read_string("pack.mcmeta"), None);
    }

    #[test]
    fn test_directory_pack() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("assets/minecraft/models/block");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("stone.json"), "{}").unwrap();

        let pack = DirectoryPack::new(dir.path());
        assert_eq!(pack.read_string("models/block/stone.json").as_deref(), Some("{}"));
        assert_eq!(pack.read_string("models/block/missing.json"), None);
        assert_eq!(pack.read_string("../secrets.txt"), None);
    }
}

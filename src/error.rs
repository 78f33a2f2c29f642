//! Error types for the mesh compiler.
//!
//! Recoverable content errors (missing resources, unresolvable block states,
//! malformed faces) never halt a build: the pipeline substitutes, skips, and
//! counts them. Only infrastructure failures (no resources at all, pool
//! failed to start) reject a build outright.

use thiserror::Error;

/// Result type alias using MeshError.
pub type Result<T> = std::result::Result<T, MeshError>;

/// Main error type for mesh compilation.
#[derive(Error, Debug)]
pub enum MeshError {
    /// A referenced model or texture is absent from every pack.
    #[error("resource missing: {0}")]
    ResourceMissing(String),

    /// A block-state definition yielded no model holders.
    #[error("no model for block: {0}")]
    NoModel(String),

    /// Model parent chain contains a cycle.
    #[error("model inheritance cycle at: {0}")]
    ModelCycle(String),

    /// Model parent chain exceeds the depth cap.
    #[error("model inheritance too deep at: {0}")]
    ModelDepthExceeded(String),

    /// Malformed face entry in a model element.
    #[error("invalid face: {0}")]
    InvalidFace(String),

    /// A chunk job arrived before the palette was uploaded to the worker.
    #[error("worker received a chunk job before the palette upload")]
    NotReady,

    /// Worker crash or message decode failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A chunk's merged buffers would exceed the u32 index range.
    #[error("chunk mesh overflows index range ({vertices} vertices)")]
    IndexOverflow { vertices: usize },

    /// Failed to parse JSON content.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or process an image.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Failed to read or parse a ZIP archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid compiler configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MeshError {
    /// The summary bucket this error counts toward.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::ResourceMissing(_) => ErrorKind::ResourceMissing,
            MeshError::NoModel(_) => ErrorKind::NoModel,
            MeshError::ModelCycle(_) => ErrorKind::ModelCycle,
            MeshError::ModelDepthExceeded(_) => ErrorKind::ModelDepthExceeded,
            MeshError::InvalidFace(_) => ErrorKind::InvalidFace,
            MeshError::NotReady => ErrorKind::NotReady,
            MeshError::Transport(_) => ErrorKind::Transport,
            MeshError::IndexOverflow { .. } => ErrorKind::IndexOverflow,
            _ => ErrorKind::Other,
        }
    }
}

/// Error kinds tracked by the end-of-build summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ResourceMissing,
    NoModel,
    ModelCycle,
    ModelDepthExceeded,
    InvalidFace,
    NotReady,
    Transport,
    IndexOverflow,
    Other,
}

impl ErrorKind {
    const COUNT: usize = 9;

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Per-kind counts of recoverable errors observed during a build.
#[derive(Debug, Clone, Default)]
pub struct ErrorCounts {
    counts: [u64; ErrorKind::COUNT],
}

impl ErrorCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of an error kind.
    pub fn record(&mut self, kind: ErrorKind) {
        self.counts[kind.index()] += 1;
    }

    /// Number of occurrences of a kind.
    pub fn get(&self, kind: ErrorKind) -> u64 {
        self.counts[kind.index()]
    }

    /// Total recoverable errors.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Merge another set of counts into this one.
    pub fn merge(&mut self, other: &ErrorCounts) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine += theirs;
        }
    }
}

impl std::fmt::Display for ErrorCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [&str; ErrorKind::COUNT] = [
            "resource_missing",
            "no_model",
            "model_cycle",
            "model_depth_exceeded",
            "invalid_face",
            "not_ready",
            "transport",
            "index_overflow",
            "other",
        ];
        let mut first = true;
        for (name, count) in NAMES.iter().zip(self.counts.iter()) {
            if *count > 0 {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", name, count)?;
                first = false;
            }
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

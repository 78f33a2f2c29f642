//! Build-session orchestration: palette compilation, chunk scheduling,
//! result collection, and error accounting.

use crate::adapter::SceneSink;
use crate::chunk::{partition, Chunk};
use crate::error::{ErrorCounts, MeshError, Result};
use crate::mesh::{BlockMeshBuilder, FaceProcessor, PaletteCompiler};
use crate::pool::{default_worker_count, ChunkJob, ChunkPayload, WorkerPool, WorkerReply};
use crate::provider::ResourceProvider;
use crate::registry::{MaterialInfo, MaterialRegistry, TextureCache};
use crate::resolver::{ModelResolver, StateResolver};
use crate::schematic::Schematic;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Largest chunk extent whose quantized positions fit i16.
const MAX_QUANTIZED_EXTENT: u32 = 31;

/// How chunk meshes are delivered to the scene sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshMode {
    /// Each chunk's mesh is delivered as soon as it returns (quantized
    /// positions, per-chunk origin).
    Incremental,
    /// Workers accumulate world-space buffers and flush one large mesh per
    /// category at the end of the build.
    Batched,
}

/// Core compiler configuration.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Chunk side length; one of 8, 16, 32, 64.
    pub chunk_side: u32,
    pub mode: MeshMode,
    /// Merge coplanar same-material faces into larger quads. Changes
    /// vertex counts, so it is off by default.
    pub greedy_meshing: bool,
    /// Worker count; 0 picks `min(hardware concurrency, 8)`.
    pub max_workers: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            chunk_side: 16,
            mode: MeshMode::Incremental,
            greedy_meshing: false,
            max_workers: 0,
        }
    }
}

impl CompilerConfig {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.chunk_side, 8 | 16 | 32 | 64) {
            return Err(MeshError::Config(format!(
                "chunk_side must be 8, 16, 32 or 64, got {}",
                self.chunk_side
            )));
        }
        Ok(())
    }
}

/// Session-scoped caches, rebuilt on schematic or resource-pack change.
pub struct BuildContext {
    pub registry: MaterialRegistry,
    pub textures: TextureCache,
}

impl BuildContext {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self {
            registry: MaterialRegistry::new(),
            textures: TextureCache::new(provider),
        }
    }
}

/// End-of-build summary.
#[derive(Debug)]
pub struct BuildReport {
    pub build_id: u64,
    pub palette_size: usize,
    pub chunk_count: usize,
    pub chunks_meshed: usize,
    pub chunks_failed: usize,
    /// Materials interned this session, in index order.
    pub materials: Vec<MaterialInfo>,
    /// Per-kind counts of recoverable errors.
    pub errors: ErrorCounts,
}

/// The voxel-world mesh compiler.
///
/// Owns the worker pool across build sessions; the palette and material
/// registry are rebuilt per session and guarded by a monotonically
/// increasing epoch so stale worker results are discarded.
pub struct MeshCompiler {
    provider: Arc<dyn ResourceProvider>,
    config: CompilerConfig,
    pool: Option<WorkerPool>,
    epoch: u64,
}

impl MeshCompiler {
    pub fn new(provider: Arc<dyn ResourceProvider>, config: CompilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            config,
            pool: None,
            epoch: 0,
        })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Run one full build session: compile the palette, mesh every chunk,
    /// deliver results to the sink, and return the summary.
    ///
    /// Recoverable errors never halt the build; they are counted in the
    /// report. Only infrastructure failures return `Err`.
    pub fn build(
        &mut self,
        schematic: &dyn Schematic,
        sink: &mut dyn SceneSink,
    ) -> Result<BuildReport> {
        self.epoch += 1;
        let epoch = self.epoch;
        let mut counts = ErrorCounts::new();

        let context = BuildContext::new(self.provider.clone());

        // Palette compilation happens on the coordinator, before any chunk
        // is dispatched.
        let palette = {
            let states = StateResolver::new(self.provider.as_ref());
            let models = ModelResolver::new(self.provider.as_ref());
            let faces = FaceProcessor::new(&context.registry);
            let builder = BlockMeshBuilder::new(&states, &models, &faces);
            PaletteCompiler::new(builder).compile(schematic, &mut counts)
        };
        let palette = Arc::new(palette);
        info!(
            build = epoch,
            palette = palette.len(),
            materials = context.registry.len(),
            "palette compiled"
        );

        // The pool persists across sessions; the palette upload must
        // complete before the first chunk job.
        let workers = if self.config.max_workers == 0 {
            default_worker_count()
        } else {
            self.config.max_workers
        };
        if self.pool.is_none() {
            self.pool = Some(WorkerPool::new(workers)?);
        }
        let pool = self.pool.as_mut().expect("pool just created");
        pool.upload_palette(palette.clone(), self.config.greedy_meshing)?;

        // Partition, then split anything too large for i16 quantization.
        let mut chunks = partition(schematic, &palette, self.config.chunk_side);
        if self.config.mode == MeshMode::Incremental {
            chunks = split_oversize(chunks);
        }
        let chunk_count = chunks.len();

        let batched = self.config.mode == MeshMode::Batched;
        let mut next_chunk_id = chunk_count as u64;
        let mut pending: VecDeque<(u64, Chunk)> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, c)| (i as u64, c))
            .collect();

        struct InFlight {
            chunk: Chunk,
            attempts: u32,
        }
        let mut in_flight: FxHashMap<u64, InFlight> = FxHashMap::default();
        let mut busy = vec![false; pool.worker_count()];
        let mut chunks_meshed = 0usize;
        let mut chunks_failed = 0usize;

        // Back-pressure: at most one in-flight job per worker; the rest
        // queue here on the coordinator.
        while !pending.is_empty() || !in_flight.is_empty() {
            loop {
                let Some(worker) = busy.iter().position(|b| !b) else {
                    break;
                };
                let Some((chunk_id, chunk)) = pending.pop_front() else {
                    break;
                };
                let payload = ChunkPayload::encode(chunk.origin, &chunk.blocks, true);
                pool.dispatch_to(
                    worker,
                    ChunkJob {
                        epoch,
                        chunk_id,
                        payload,
                        batched,
                    },
                )?;
                busy[worker] = true;
                let attempts = in_flight
                    .get(&chunk_id)
                    .map(|f| f.attempts)
                    .unwrap_or(0);
                in_flight.insert(chunk_id, InFlight { chunk, attempts });
            }

            let reply = pool.recv_reply()?;
            match reply {
                WorkerReply::ChunkDone {
                    epoch: reply_epoch,
                    worker,
                    chunk_id,
                    result,
                } => {
                    if reply_epoch != epoch {
                        debug!(chunk_id, reply_epoch, "discarding stale result");
                        continue;
                    }
                    busy[worker] = false;
                    let Some(mut flight) = in_flight.remove(&chunk_id) else {
                        continue;
                    };

                    match result {
                        Ok(meshes) => {
                            chunks_meshed += 1;
                            for (category, mesh) in meshes {
                                sink.on_chunk_mesh(chunk_id, category, mesh);
                            }
                        }
                        Err(MeshError::IndexOverflow { vertices }) => {
                            counts.record(crate::error::ErrorKind::IndexOverflow);
                            match flight.chunk.split() {
                                Some((low, high)) => {
                                    debug!(chunk_id, vertices, "splitting oversize chunk");
                                    for half in [low, high] {
                                        if !half.blocks.is_empty() {
                                            pending.push_back((next_chunk_id, half));
                                            next_chunk_id += 1;
                                        }
                                    }
                                }
                                None => {
                                    chunks_failed += 1;
                                    sink.on_chunk_failed(
                                        chunk_id,
                                        &MeshError::IndexOverflow { vertices },
                                    );
                                }
                            }
                        }
                        Err(error) => {
                            // One retry per chunk; the second failure is
                            // reported and the build continues.
                            if flight.attempts == 0 {
                                warn!(chunk_id, %error, "re-enqueueing failed chunk");
                                flight.attempts = 1;
                                let chunk_ref = flight.chunk.clone();
                                in_flight.insert(chunk_id, flight);
                                pending.push_back((chunk_id, chunk_ref));
                            } else {
                                counts.record(error.kind());
                                chunks_failed += 1;
                                sink.on_chunk_failed(chunk_id, &error);
                            }
                        }
                    }
                }
                WorkerReply::BatchFlushed { epoch: e, .. } if e != epoch => continue,
                other => {
                    debug!(?other, "unexpected reply during chunk phase");
                }
            }
        }

        // Batched mode: one flush per worker, one large mesh per category.
        if batched {
            pool.flush_batches(epoch)?;
            let mut flushed = 0;
            while flushed < pool.worker_count() {
                match pool.recv_reply()? {
                    WorkerReply::BatchFlushed {
                        epoch: e,
                        worker,
                        meshes,
                    } if e == epoch => {
                        flushed += 1;
                        let batch_id = next_chunk_id + worker as u64;
                        for (category, mesh) in meshes {
                            sink.on_chunk_mesh(batch_id, category, mesh);
                        }
                    }
                    _ => continue,
                }
            }
        }

        sink.on_build_complete(epoch);

        let report = BuildReport {
            build_id: epoch,
            palette_size: palette.len(),
            chunk_count,
            chunks_meshed,
            chunks_failed,
            materials: context.registry.snapshot(),
            errors: counts,
        };
        info!(
            build = epoch,
            chunks = report.chunk_count,
            meshed = report.chunks_meshed,
            failed = report.chunks_failed,
            errors = %report.errors,
            "build complete"
        );
        Ok(report)
    }
}

/// Split chunks until every extent fits i16 quantization, dropping halves
/// that end up with no blocks.
fn split_oversize(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut out = Vec::with_capacity(chunks.len());
    let mut queue: VecDeque<Chunk> = chunks.into();
    while let Some(chunk) = queue.pop_front() {
        if chunk.blocks.is_empty() {
            continue;
        }
        if chunk.size.iter().all(|&s| s <= MAX_QUANTIZED_EXTENT) {
            out.push(chunk);
            continue;
        }
        match chunk.split() {
            Some((low, high)) => {
                queue.push_back(low);
                queue.push_back(high);
            }
            None => out.push(chunk),
        }
    }
    out
}

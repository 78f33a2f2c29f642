//! Worker pool: palette broadcast, chunk job dispatch, and result transport.
//!
//! Each worker is a single thread owning a replica of the immutable palette.
//! The coordinator broadcasts the palette once per build session, then
//! round-robins chunk jobs; workers process one job to completion at a time
//! and never suspend mid-merge.

pub mod transport;

pub use transport::{BufferPool, ChunkPayload};

use crate::chunk::{ChunkMesher, MergeMode, MergedMesh};
use crate::error::{MeshError, Result};
use crate::mesh::Palette;
use crate::types::Category;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Hard cap on pool size.
pub const MAX_WORKERS: usize = 8;

/// Default worker count: hardware concurrency capped at [`MAX_WORKERS`].
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_WORKERS)
}

/// How long to wait for palette-upload acknowledgements.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// A chunk meshing job.
#[derive(Debug, Clone)]
pub struct ChunkJob {
    /// Build-session epoch; stale results are discarded by the coordinator.
    pub epoch: u64,
    pub chunk_id: u64,
    pub payload: ChunkPayload,
    /// Batched jobs accumulate world-space buffers on the worker instead of
    /// replying with per-chunk meshes.
    pub batched: bool,
}

enum WorkerJob {
    UploadPalette {
        palette: Arc<Palette>,
        greedy: bool,
    },
    Chunk(ChunkJob),
    FlushBatch {
        epoch: u64,
    },
    Shutdown,
}

/// Replies from workers to the coordinator.
#[derive(Debug)]
pub enum WorkerReply {
    PaletteReady {
        worker: usize,
    },
    ChunkDone {
        epoch: u64,
        worker: usize,
        chunk_id: u64,
        result: Result<Vec<(Category, MergedMesh)>>,
    },
    BatchFlushed {
        epoch: u64,
        worker: usize,
        meshes: Vec<(Category, MergedMesh)>,
    },
}

struct WorkerHandle {
    jobs: Sender<WorkerJob>,
    thread: Option<std::thread::JoinHandle<()>>,
}

/// A fixed-size pool of mesh workers.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    replies: Receiver<WorkerReply>,
    pending: VecDeque<WorkerReply>,
    next: usize,
}

impl WorkerPool {
    /// Spawn a pool with an explicit worker count (clamped to
    /// [1, [`MAX_WORKERS`]]). A spawn failure rejects the whole build.
    pub fn new(count: usize) -> Result<Self> {
        let count = count.clamp(1, MAX_WORKERS);
        let (reply_tx, reply_rx) = unbounded();

        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let (job_tx, job_rx) = unbounded();
            let replies = reply_tx.clone();
            let thread = std::thread::Builder::new()
                .name(format!("mesh-worker-{}", index))
                .spawn(move || worker_loop(index, job_rx, replies))
                .map_err(|e| MeshError::Transport(format!("failed to spawn worker: {}", e)))?;
            workers.push(WorkerHandle {
                jobs: job_tx,
                thread: Some(thread),
            });
        }

        Ok(Self {
            workers,
            replies: reply_rx,
            pending: VecDeque::new(),
            next: 0,
        })
    }

    /// Spawn with the default size.
    pub fn with_default_size() -> Result<Self> {
        Self::new(default_worker_count())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Broadcast the palette to every worker and wait for every
    /// acknowledgement. Must complete before any chunk job is dispatched.
    pub fn upload_palette(&mut self, palette: Arc<Palette>, greedy: bool) -> Result<()> {
        for worker in &self.workers {
            worker
                .jobs
                .send(WorkerJob::UploadPalette {
                    palette: palette.clone(),
                    greedy,
                })
                .map_err(|_| MeshError::Transport("worker channel closed".into()))?;
        }

        let mut ready = 0;
        while ready < self.workers.len() {
            let reply = self
                .replies
                .recv_timeout(UPLOAD_TIMEOUT)
                .map_err(|_| MeshError::Transport("palette upload timed out".into()))?;
            match reply {
                WorkerReply::PaletteReady { worker } => {
                    debug!(worker, "palette replicated");
                    ready += 1;
                }
                // Stale chunk results from a previous session surface here;
                // park them for the normal receive path to discard.
                other => self.pending.push_back(other),
            }
        }
        Ok(())
    }

    /// Dispatch a chunk job round-robin. Returns the worker index.
    pub fn dispatch(&mut self, job: ChunkJob) -> Result<usize> {
        let worker = self.next;
        self.next = (self.next + 1) % self.workers.len();
        self.dispatch_to(worker, job)?;
        Ok(worker)
    }

    /// Dispatch a chunk job to a specific worker.
    pub fn dispatch_to(&self, worker: usize, job: ChunkJob) -> Result<()> {
        self.workers[worker]
            .jobs
            .send(WorkerJob::Chunk(job))
            .map_err(|_| MeshError::Transport(format!("worker {} is gone", worker)))
    }

    /// Signal every worker to flush its batch accumulators.
    pub fn flush_batches(&self, epoch: u64) -> Result<()> {
        for worker in &self.workers {
            worker
                .jobs
                .send(WorkerJob::FlushBatch { epoch })
                .map_err(|_| MeshError::Transport("worker channel closed".into()))?;
        }
        Ok(())
    }

    /// Receive the next worker reply, blocking.
    pub fn recv_reply(&mut self) -> Result<WorkerReply> {
        if let Some(reply) = self.pending.pop_front() {
            return Ok(reply);
        }
        self.replies
            .recv()
            .map_err(|_| MeshError::Transport("all workers terminated".into()))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            let _ = worker.jobs.send(WorkerJob::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

/// The worker thread body: replicate the palette once, then merge chunks to
/// completion, one at a time.
fn worker_loop(index: usize, jobs: Receiver<WorkerJob>, replies: Sender<WorkerReply>) {
    let mut mesher: Option<ChunkMesher> = None;
    let mut batch: BTreeMap<Category, MergedMesh> = BTreeMap::new();

    while let Ok(job) = jobs.recv() {
        match job {
            WorkerJob::UploadPalette { palette, greedy } => {
                mesher = Some(ChunkMesher::new(palette, greedy));
                batch.clear();
                if replies.send(WorkerReply::PaletteReady { worker: index }).is_err() {
                    break;
                }
            }
            WorkerJob::Chunk(job) => {
                let result = mesh_chunk(&mut mesher, &mut batch, &job);
                let reply = WorkerReply::ChunkDone {
                    epoch: job.epoch,
                    worker: index,
                    chunk_id: job.chunk_id,
                    result,
                };
                if replies.send(reply).is_err() {
                    break;
                }
            }
            WorkerJob::FlushBatch { epoch } => {
                let meshes = std::mem::take(&mut batch).into_iter().collect();
                let reply = WorkerReply::BatchFlushed {
                    epoch,
                    worker: index,
                    meshes,
                };
                if replies.send(reply).is_err() {
                    break;
                }
            }
            WorkerJob::Shutdown => break,
        }
    }
    debug!(worker = index, "mesh worker stopped");
}

/// Merge one chunk job, accumulating into the batch map when requested.
fn mesh_chunk(
    mesher: &mut Option<ChunkMesher>,
    batch: &mut BTreeMap<Category, MergedMesh>,
    job: &ChunkJob,
) -> Result<Vec<(Category, MergedMesh)>> {
    let Some(mesher) = mesher.as_mut() else {
        warn!(chunk = job.chunk_id, "chunk job before palette upload");
        return Err(MeshError::NotReady);
    };

    let (origin, blocks) = job.payload.decode()?;
    let mode = if job.batched {
        MergeMode::World
    } else {
        MergeMode::Quantized
    };
    let meshes = mesher.merge(blocks, origin, mode)?;

    if job.batched {
        for (category, mesh) in meshes {
            match batch.get_mut(&category) {
                Some(existing) => existing.concat(mesh),
                None => {
                    batch.insert(category, mesh);
                }
            }
        }
        Ok(Vec::new())
    } else {
        Ok(meshes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::schematic::MapSchematic;
    use crate::types::{BlockKey, BlockPosition};

    fn stone_world() -> MapSchematic {
        let mut world = MapSchematic::new();
        world.set_block(BlockPosition::new(0, 0, 0), BlockKey::new("minecraft:stone"));
        world
    }

    #[test]
    fn test_chunk_before_palette_is_not_ready() {
        let mut pool = WorkerPool::new(1).unwrap();
        let payload = ChunkPayload::encode([0, 0, 0], &[0, 0, 0, 0], false);
        pool.dispatch(ChunkJob {
            epoch: 1,
            chunk_id: 0,
            payload,
            batched: false,
        })
        .unwrap();

        match pool.recv_reply().unwrap() {
            WorkerReply::ChunkDone { result, .. } => {
                assert!(matches!(result, Err(MeshError::NotReady)));
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_palette_upload_then_chunk() {
        let world = stone_world();
        let (palette, _) = fixtures::compile_palette(&world);

        let mut pool = WorkerPool::new(2).unwrap();
        pool.upload_palette(Arc::new(palette), false).unwrap();

        let payload = ChunkPayload::encode([0, 0, 0], &[0, 0, 0, 0], true);
        pool.dispatch(ChunkJob {
            epoch: 1,
            chunk_id: 7,
            payload,
            batched: false,
        })
        .unwrap();

        match pool.recv_reply().unwrap() {
            WorkerReply::ChunkDone {
                epoch,
                chunk_id,
                result,
                ..
            } => {
                assert_eq!(epoch, 1);
                assert_eq!(chunk_id, 7);
                let meshes = result.unwrap();
                assert_eq!(meshes.len(), 1);
                assert_eq!(meshes[0].1.vertex_count(), 24);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_batched_accumulate_and_flush() {
        let world = stone_world();
        let (palette, _) = fixtures::compile_palette(&world);

        let mut pool = WorkerPool::new(1).unwrap();
        pool.upload_palette(Arc::new(palette), false).unwrap();

        // Two far-apart chunks accumulate into one flush.
        for (id, x) in [(0i64, 0i32), (1, 100)] {
            let payload = ChunkPayload::encode([x, 0, 0], &[x, 0, 0, 0], false);
            pool.dispatch(ChunkJob {
                epoch: 3,
                chunk_id: id as u64,
                payload,
                batched: true,
            })
            .unwrap();
        }
        for _ in 0..2 {
            match pool.recv_reply().unwrap() {
                WorkerReply::ChunkDone { result, .. } => {
                    assert!(result.unwrap().is_empty());
                }
                other => panic!("unexpected reply: {:?}", other),
            }
        }

        pool.flush_batches(3).unwrap();
        match pool.recv_reply().unwrap() {
            WorkerReply::BatchFlushed { epoch, meshes, .. } => {
                assert_eq!(epoch, 3);
                assert_eq!(meshes.len(), 1);
                // Both cubes merged into one world-space buffer.
                assert_eq!(meshes[0].1.vertex_count(), 48);
                assert_eq!(meshes[0].1.origin, [0.0; 3]);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_round_robin_alternates() {
        let world = stone_world();
        let (palette, _) = fixtures::compile_palette(&world);
        let mut pool = WorkerPool::new(2).unwrap();
        pool.upload_palette(Arc::new(palette), false).unwrap();

        let mut seen = Vec::new();
        for id in 0..4u64 {
            let payload = ChunkPayload::encode([0, 0, 0], &[0, 0, 0, 0], false);
            let worker = pool
                .dispatch(ChunkJob {
                    epoch: 1,
                    chunk_id: id,
                    payload,
                    batched: false,
                })
                .unwrap();
            seen.push(worker);
        }
        assert_eq!(seen, vec![0, 1, 0, 1]);
        for _ in 0..4 {
            pool.recv_reply().unwrap();
        }
    }

    #[test]
    fn test_default_worker_count_capped() {
        assert!(default_worker_count() >= 1);
        assert!(default_worker_count() <= MAX_WORKERS);
    }
}

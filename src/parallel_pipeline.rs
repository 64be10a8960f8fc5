// THEORY:
// Cells of a mosaic are data-independent: no cell's fusion reads another
// cell's captures, and every cell's placement region on the canvas is
// disjoint by construction. That makes the fusion stage embarrassingly
// parallel, and this module exploits it with a small worker pool: each
// worker exclusively owns the accumulator and mask buffers of whatever cell
// it is fusing, so no locking discipline is needed anywhere in the core.
//
// Composition is deliberately NOT parallelized. An oversized quadrant may
// legally spill into its neighbour's region, so canvas writes are kept on
// the caller's task, in cell order, after every fusion result has been
// gathered. Serialization is what makes the overlap edge case deterministic.

use crate::core_modules::fusion::{self, FusionError};
use crate::core_modules::pixel_buffer::pixel_buffer::{CellSource, WidePixelBuffer};
use crate::core_modules::utils::image_helper::image_helper;
use crate::pipeline::{MosaicPipeline, PipelineConfig, PipelineError, PixelBuffer};
use log::info;
use tokio::sync::{mpsc, oneshot};

const MAX_WORKER_POOL_SIZE: usize = 8;

fn default_worker_count() -> usize {
    num_cpus::get().clamp(1, MAX_WORKER_POOL_SIZE)
}

/// One cell's fusion job: the capture stack plus a channel for the result.
pub struct FusionTask {
    pub cell_index: usize,
    pub group: Vec<CellSource>,
    pub result_sender: oneshot::Sender<(usize, Result<WidePixelBuffer, FusionError>)>,
}

/// A fixed set of fusion workers fed round-robin by a dispatcher task.
pub struct FusionWorkerPool {
    task_sender: mpsc::UnboundedSender<FusionTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl FusionWorkerPool {
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FusionTask>();
        let mut workers = Vec::with_capacity(worker_count);

        // Create a single dispatcher that distributes tasks to workers.
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<FusionTask>())
            .unzip();

        tokio::spawn(async move {
            let mut worker_index = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_index].send(task);
                worker_index = (worker_index + 1) % worker_count;
            }
        });

        // Each worker owns its own accumulator and mask buffers for the
        // duration of a task; nothing is shared between workers.
        for mut worker_receiver in worker_receivers {
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let result = fusion::fuse_group(&task.group);
                    let _ = task.result_sender.send((task.cell_index, result));
                }
            }));
        }

        Self {
            task_sender,
            workers,
        }
    }

    /// Queues one cell's stack for fusion and returns the receiver its
    /// result will arrive on.
    pub fn submit(
        &self,
        cell_index: usize,
        group: Vec<CellSource>,
    ) -> Result<oneshot::Receiver<(usize, Result<WidePixelBuffer, FusionError>)>, &'static str>
    {
        let (result_sender, result_receiver) = oneshot::channel();
        let task = FusionTask {
            cell_index,
            group,
            result_sender,
        };
        self.task_sender
            .send(task)
            .map_err(|_| "failed to send task to worker pool")?;
        Ok(result_receiver)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

/// The parallel variant of the mosaic engine: same contract as
/// `MosaicPipeline`, with the fusion stage fanned out across a worker pool.
/// Must be constructed inside a tokio runtime.
pub struct ParallelMosaicPipeline {
    inner: MosaicPipeline,
    worker_pool: FusionWorkerPool,
}

impl ParallelMosaicPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_worker_count(config, default_worker_count())
    }

    pub fn with_worker_count(
        config: PipelineConfig,
        worker_count: usize,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            inner: MosaicPipeline::new(config)?,
            worker_pool: FusionWorkerPool::new(worker_count),
        })
    }

    /// Fuses every cell's stack concurrently. Results are returned in cell
    /// order regardless of completion order; if any cell's stack yields
    /// nothing to fuse, the lowest failing cell index is reported and the
    /// whole invocation aborts.
    pub async fn fuse_cells(
        &self,
        cell_groups: Vec<Vec<CellSource>>,
    ) -> Result<Vec<CellSource>, PipelineError> {
        let mut receivers = Vec::with_capacity(cell_groups.len());
        for (index, group) in cell_groups.into_iter().enumerate() {
            receivers.push(
                self.worker_pool
                    .submit(index, group)
                    .map_err(PipelineError::WorkerPool)?,
            );
        }

        let mut fused: Vec<CellSource> = vec![CellSource::Missing; receivers.len()];
        let mut first_failure: Option<(usize, FusionError)> = None;
        for outcome in futures::future::join_all(receivers).await {
            let (index, result) = outcome
                .map_err(|_| PipelineError::WorkerPool("failed to receive result from worker"))?;
            match result {
                Ok(buffer) => fused[index] = CellSource::Loaded(buffer.narrow_saturating()),
                Err(source) => match first_failure {
                    Some((failed_index, _)) if failed_index <= index => {}
                    _ => first_failure = Some((index, source)),
                },
            }
        }

        match first_failure {
            Some((index, source)) => Err(PipelineError::Fusion { index, source }),
            None => Ok(fused),
        }
    }

    /// The full assembly flow with parallel fusion: load every cell's stack,
    /// fuse across the pool, persist each fused quadrant, then composite and
    /// persist the canvas on this task.
    pub async fn assemble_from_files(
        &self,
        cell_groups: &[Vec<String>],
        quadrant_paths: &[String],
        canvas_path: &str,
        secondary_canvas_path: Option<&str>,
    ) -> Result<PixelBuffer, PipelineError> {
        if cell_groups.len() != quadrant_paths.len() {
            return Err(PipelineError::QuadrantPathCount {
                groups: cell_groups.len(),
                paths: quadrant_paths.len(),
            });
        }

        let groups: Vec<Vec<CellSource>> = cell_groups
            .iter()
            .map(|paths| paths.iter().map(|path| image_helper::load(path)).collect())
            .collect();
        let fused_cells = self.fuse_cells(groups).await?;

        for (cell, quadrant_path) in fused_cells.iter().zip(quadrant_paths) {
            if let CellSource::Loaded(quadrant) = cell {
                image_helper::save(quadrant, quadrant_path).map_err(|source| {
                    PipelineError::Sink {
                        path: quadrant_path.clone(),
                        source,
                    }
                })?;
                info!("mean fusion completed for {quadrant_path}");
            }
        }

        self.inner
            .finish_canvas(&fused_cells, canvas_path, secondary_canvas_path)
    }
}

//! Worker pool
//!
//! Long-lived rasterizer threads, one per logical core by default. Job
//! handoff uses one mutex and condvar pair per worker; the scheduler parks a
//! frame job in each worker's slot, signals it, and then waits on every
//! worker's completion flag before returning, which establishes the
//! happens-before from all raster writes to the caller's post-frame reads.
//! Shutdown is cooperative through a per-worker quit flag.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use glam::{IVec2, Vec2, Vec4};

use crate::DefaultLayout;
use crate::clip::ClipScratch;
use crate::layout::Layout;
use crate::raster::{DrawCall, RenderContext, rasterize_area};
use crate::texture::Texture;
use crate::tiles::{RasterArea, frame_areas};

/// Errors the scheduler can report; everything past startup either draws or
/// skips.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("failed to spawn rasterizer worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A draw call flattened to raw parts so a frame job can cross the thread
/// boundary. Reconstructed into borrowed slices inside the worker.
#[derive(Clone, Copy)]
struct RawDrawCall {
    vertices: *const Vec4,
    vertex_count: usize,
    uvs: *const Vec2,
    uv_count: usize,
    indices: *const u32,
    index_count: usize,
    texels: *const u32,
    texel_count: usize,
    texture_size: IVec2,
}

impl RawDrawCall {
    fn from_call(call: &DrawCall<'_>) -> Self {
        let (texels, texture_size) = call.texture.raw_parts();
        Self {
            vertices: call.vertices.as_ptr(),
            vertex_count: call.vertices.len(),
            uvs: call.uvs.as_ptr(),
            uv_count: call.uvs.len(),
            indices: call.indices.as_ptr(),
            index_count: call.indices.len(),
            texels: texels.as_ptr(),
            texel_count: texels.len(),
            texture_size,
        }
    }

    /// Safety: the buffers behind the pointers must still be alive; the
    /// scheduler guarantees this by joining the frame before `render_frame`
    /// returns.
    unsafe fn as_draw_call<'a>(&self) -> DrawCall<'a> {
        unsafe {
            DrawCall {
                vertices: std::slice::from_raw_parts(self.vertices, self.vertex_count),
                uvs: std::slice::from_raw_parts(self.uvs, self.uv_count),
                indices: std::slice::from_raw_parts(self.indices, self.index_count),
                texture: Texture::new(
                    std::slice::from_raw_parts(self.texels, self.texel_count),
                    self.texture_size,
                ),
            }
        }
    }
}

/// One frame's work for one worker: the shared surfaces, the areas this
/// worker owns, and the ordered draw list.
struct FrameJob {
    color: *mut u32,
    depth: *mut u32,
    surface_len: usize,
    target: IVec2,
    areas: Vec<RasterArea>,
    calls: Vec<RawDrawCall>,
}

// Safety: the color and depth pointers are shared between workers, but each
// job carries disjoint raster areas, so no word of either surface is written
// by more than one thread; the geometry and texture buffers are read-only for
// the frame, and the scheduler keeps all of them alive until every worker has
// signalled completion.
unsafe impl Send for FrameJob {}

struct WorkerState {
    job: Option<FrameJob>,
    busy: bool,
    quit: bool,
}

struct WorkerShared {
    state: Mutex<WorkerState>,
    task: Condvar,
    done: Condvar,
}

struct Worker {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
}

/// The frame scheduler: owns the worker threads and splits each frame into
/// per-worker raster areas.
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Pool with one worker per logical core.
    pub fn new() -> Result<Self, PoolError> {
        let cores = thread::available_parallelism().map_or(1, |n| n.get());
        Self::with_workers(cores)
    }

    /// Pool with an explicit worker count (minimum one).
    pub fn with_workers(count: usize) -> Result<Self, PoolError> {
        let count = count.max(1);
        let mut workers = Vec::with_capacity(count);
        for i in 0..count {
            let shared = Arc::new(WorkerShared {
                state: Mutex::new(WorkerState {
                    job: None,
                    busy: false,
                    quit: false,
                }),
                task: Condvar::new(),
                done: Condvar::new(),
            });
            let thread_shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("raster-{i}"))
                .spawn(move || worker_main(thread_shared))?;
            workers.push(Worker {
                shared,
                handle: Some(handle),
            });
        }
        log::debug!("spawned {count} rasterizer workers");
        Ok(Self { workers })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Render one frame: partition the target, hand every worker its areas
    /// and the ordered draw list, and block until all workers have finished.
    ///
    /// The surfaces must be allocated at `padded_size(target)`; draw order is
    /// preserved within each area, and the depth test makes the result
    /// independent of how areas are distributed.
    pub fn render_frame(
        &mut self,
        color: &mut [u32],
        depth: &mut [u32],
        target: IVec2,
        calls: &[DrawCall<'_>],
    ) {
        let padded = DefaultLayout::padded(target);
        let surface_len = (padded.x * padded.y) as usize;
        debug_assert!(color.len() >= surface_len, "color buffer not padded");
        debug_assert!(depth.len() >= surface_len, "depth buffer not padded");

        let areas = frame_areas::<DefaultLayout>(target, self.workers.len());
        log::trace!(
            "frame: {} areas over {} workers, {} draw calls",
            areas.len(),
            self.workers.len(),
            calls.len()
        );

        let mut per_worker: Vec<Vec<RasterArea>> = vec![Vec::new(); self.workers.len()];
        for (i, area) in areas.into_iter().enumerate() {
            per_worker[i % self.workers.len()].push(area);
        }
        let raw_calls: Vec<RawDrawCall> = calls.iter().map(RawDrawCall::from_call).collect();

        for (worker, areas) in self.workers.iter().zip(per_worker) {
            if areas.is_empty() {
                continue;
            }
            let job = FrameJob {
                color: color.as_mut_ptr(),
                depth: depth.as_mut_ptr(),
                surface_len,
                target,
                areas,
                calls: raw_calls.clone(),
            };
            let mut state = worker.shared.state.lock().unwrap();
            debug_assert!(
                !state.busy && state.job.is_none(),
                "previous frame not joined"
            );
            state.job = Some(job);
            state.busy = true;
            drop(state);
            worker.shared.task.notify_one();
        }

        // Join: the frame is done when every completion flag has dropped.
        for worker in &self.workers {
            let mut state = worker.shared.state.lock().unwrap();
            while state.busy || state.job.is_some() {
                state = worker.shared.done.wait(state).unwrap();
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            let mut state = worker.shared.state.lock().unwrap();
            state.quit = true;
            drop(state);
            worker.shared.task.notify_one();
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
        log::debug!("rasterizer workers joined");
    }
}

/// Worker loop: sleep on the task signal, run the job over every owned area,
/// flag completion, repeat. The clip scratch lives here so a frame never
/// allocates.
fn worker_main(shared: Arc<WorkerShared>) {
    let mut scratch = ClipScratch::new();
    loop {
        let job = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if state.quit {
                    return;
                }
                if let Some(job) = state.job.take() {
                    break job;
                }
                state = shared.task.wait(state).unwrap();
            }
        };

        // Safety: see the Send rationale on FrameJob.
        let ctx =
            unsafe { RenderContext::from_raw(job.color, job.depth, job.surface_len, job.target) };
        for area in &job.areas {
            for raw in &job.calls {
                let call = unsafe { raw.as_draw_call() };
                rasterize_area::<DefaultLayout>(&ctx, area.min, area.max, &call, &mut scratch);
            }
        }

        let mut state = shared.state.lock().unwrap();
        state.busy = false;
        drop(state);
        shared.done.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_starts_and_shuts_down() {
        let pool = WorkerPool::with_workers(3).unwrap();
        assert_eq!(pool.worker_count(), 3);
        drop(pool);
    }

    #[test]
    fn empty_frame_completes() {
        let mut pool = WorkerPool::with_workers(2).unwrap();
        let target = IVec2::new(16, 16);
        let padded = DefaultLayout::padded(target);
        let len = (padded.x * padded.y) as usize;
        let mut color = vec![0u32; len];
        let mut depth = vec![0u32; len];
        pool.render_frame(&mut color, &mut depth, target, &[]);
        assert!(color.iter().all(|&c| c == 0));
    }
}

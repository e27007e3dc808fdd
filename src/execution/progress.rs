//! Progress tracking for runs.

use crate::core::config::Mode;
use crate::filters::effect::Effect;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// A run has started.
    Started {
        mode: Mode,
        total_tasks: usize,
        threads: usize,
    },
    /// Every partition of a task's stage has finished.
    StageCompleted {
        task: usize,
        stage: usize,
        effect: Effect,
        stages: usize,
    },
    /// A task's final image was saved.
    TaskSaved {
        task: usize,
        destination: PathBuf,
    },
    /// A task failed.
    TaskFailed {
        task: usize,
        message: String,
    },
    /// Overall progress percentage.
    Progress {
        percent: f32,
        elapsed_ms: u64,
        estimated_remaining_ms: Option<u64>,
    },
    /// The run was cancelled; unfinished tasks will be reported as aborted.
    Cancelled,
    /// The run has finished.
    Completed {
        total_duration_ms: u64,
        tasks_saved: usize,
        tasks_failed: usize,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Tracks run progress and allows cancellation.
///
/// Shared by reference with every worker of a run.
pub struct ProgressTracker {
    /// Total number of tasks in the run.
    total_tasks: usize,
    /// Number of tasks saved.
    saved_tasks: AtomicU64,
    /// Number of tasks failed.
    failed_tasks: AtomicU64,
    /// Whether the run is cancelled.
    cancelled: AtomicBool,
    /// Start time.
    start_time: Option<Instant>,
    /// Progress callback.
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new(total_tasks: usize) -> Self {
        Self {
            total_tasks,
            saved_tasks: AtomicU64::new(0),
            failed_tasks: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            start_time: None,
            callback: None,
        }
    }

    /// Set a callback for progress updates.
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Start tracking.
    pub fn start(&mut self, mode: Mode, threads: usize) {
        self.start_time = Some(Instant::now());
        self.send_update(ProgressUpdate::Started {
            mode,
            total_tasks: self.total_tasks,
            threads,
        });
    }

    /// Report that a stage of a task finished on every partition.
    pub fn stage_completed(&self, task: usize, stage: usize, effect: Effect, stages: usize) {
        log::debug!("Task {task}: stage {}/{stages} ({effect}) complete", stage + 1);
        self.send_update(ProgressUpdate::StageCompleted {
            task,
            stage,
            effect,
            stages,
        });
    }

    /// Report that a task was saved.
    pub fn task_saved(&self, task: usize, destination: PathBuf) {
        self.saved_tasks.fetch_add(1, Ordering::Relaxed);
        self.send_update(ProgressUpdate::TaskSaved { task, destination });
        self.send_progress_update();
    }

    /// Report that a task failed.
    pub fn task_failed(&self, task: usize, message: String) {
        self.failed_tasks.fetch_add(1, Ordering::Relaxed);
        self.send_update(ProgressUpdate::TaskFailed { task, message });
        self.send_progress_update();
    }

    /// Check if the run should stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Request cancellation.
    ///
    /// Only the first request emits [`ProgressUpdate::Cancelled`].
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::Relaxed) {
            self.send_update(ProgressUpdate::Cancelled);
        }
    }

    /// Complete tracking.
    pub fn complete(&self) {
        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: self.elapsed_ms(),
            tasks_saved: self.saved_tasks.load(Ordering::Relaxed) as usize,
            tasks_failed: self.failed_tasks.load(Ordering::Relaxed) as usize,
        });
    }

    /// Get current progress percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_tasks == 0 {
            return 100.0;
        }
        (self.finished() as f32 / self.total_tasks as f32) * 100.0
    }

    /// Estimate remaining time in milliseconds from the average so far.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        let finished = self.finished() as u64;
        if finished == 0 || self.start_time.is_none() {
            return None;
        }

        let average = self.elapsed_ms() / finished;
        let remaining = (self.total_tasks as u64).saturating_sub(finished);
        Some(average * remaining)
    }

    fn finished(&self) -> usize {
        (self.saved_tasks.load(Ordering::Relaxed) + self.failed_tasks.load(Ordering::Relaxed))
            as usize
    }

    fn elapsed_ms(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }

    fn send_progress_update(&self) {
        self.send_update(ProgressUpdate::Progress {
            percent: self.progress_percent(),
            elapsed_ms: self.elapsed_ms(),
            estimated_remaining_ms: self.estimated_remaining_ms(),
        });
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total_tasks", &self.total_tasks)
            .field("saved_tasks", &self.saved_tasks)
            .field("failed_tasks", &self.failed_tasks)
            .field("cancelled", &self.cancelled)
            .field("callback", &self.callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

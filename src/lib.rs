//! # Lockstep - batch image effects under interchangeable schedulers
//!
//! Lockstep applies ordered effect pipelines (grayscale, sharpen, edge
//! detection, box blur) to batches of images using one of three scheduling
//! models:
//!
//! - **Sequential**: one thread, one effect at a time. The reference output.
//! - **BSP**: `N` persistent workers in global lock-step; every worker
//!   finishes its band of the current `(task, stage)` before any moves on.
//! - **Pipeline**: a generator, a pool of stage-workers that fan each stage
//!   out over the image's bands, and an aggregator, joined by channels.
//!
//! All three share the same row-band partitioner and the same
//! double-buffered [`Image`](crate::core::image::Image), and produce identical
//! pixels for the same input.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lockstep::prelude::*;
//!
//! let config = RunConfig::new()
//!     .with_mode(Mode::Bsp)
//!     .with_threads(4)
//!     .with_data_dirs("small+big")
//!     .with_data_root("../data");
//!
//! let report = ExecutionEngine::new(config).execute(&PngStore::new())?;
//! for (outcome, error) in report.failures() {
//!     eprintln!("task {} failed: {error}", outcome.index);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: regions and partitioning, pixel planes, tasks, config, errors
//! - [`filters`]: the effects and their kernels
//! - [`io`]: job lists, data layout and image storage
//! - [`execution`]: the schedulers, synchronization, progress and reports

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod execution;
pub mod filters;
pub mod io;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use lockstep::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::config::{FailurePolicy, Mode, RunConfig};
    pub use crate::core::image::{Band, Image, Pixel, Plane};
    pub use crate::core::region::{partition, partitions, Region};
    pub use crate::core::task::{ImageTask, StageTransition, TaskSpec};

    // Errors
    pub use crate::core::error::{
        ConfigError, ImageError, JobError, LockstepError, TaskError,
    };

    // Effects
    pub use crate::filters::effect::{Effect, Kernel};

    // I/O
    pub use crate::io::jobs::{expand, parse_jobs, read_jobs, DataLayout, JobSpec};
    pub use crate::io::store::{ImageStore, MemoryStore, PngStore};

    // Execution
    pub use crate::execution::bsp::BspEngine;
    pub use crate::execution::engine::{ExecutionEngine, RunOptions};
    pub use crate::execution::pipeline::PipelineEngine;
    pub use crate::execution::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
    pub use crate::execution::report::{RunReport, RunStats, TaskOutcome, TaskStatus};
    pub use crate::execution::scheduler::{scheduler_for, Scheduler};
    pub use crate::execution::sequential::SequentialEngine;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

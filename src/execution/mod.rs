//! Execution engine module.
//!
//! This module holds the three scheduling models and the machinery they
//! share: synchronization primitives, progress tracking and run reports.

pub mod bsp;
pub mod engine;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod scheduler;
pub mod sequential;
pub mod sync;

pub use bsp::BspEngine;
pub use engine::{ExecutionEngine, RunOptions};
pub use pipeline::PipelineEngine;
pub use progress::{ProgressTracker, ProgressUpdate};
pub use report::{OutcomeLog, RunReport, RunStats, TaskOutcome, TaskStatus};
pub use scheduler::{scheduler_for, Scheduler};
pub use sequential::SequentialEngine;

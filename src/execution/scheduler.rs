//! The interface shared by the scheduling models.

use crate::core::config::{FailurePolicy, Mode};
use crate::core::task::TaskSpec;
use crate::execution::bsp::BspEngine;
use crate::execution::pipeline::PipelineEngine;
use crate::execution::progress::ProgressTracker;
use crate::execution::report::RunReport;
use crate::execution::sequential::SequentialEngine;
use crate::io::store::ImageStore;

/// A scheduling model: turns a list of task specs into saved images.
///
/// Every implementation loads each task's source through `store`, applies
/// its effects in order, saves the final plane through `store` and reports
/// exactly one outcome per spec. For the same inputs every implementation
/// produces identical pixels.
pub trait Scheduler: Send + Sync {
    /// The model this scheduler implements.
    fn mode(&self) -> Mode;

    /// Worker count used for partitioning.
    fn threads(&self) -> usize;

    /// Run every task.
    fn run(&self, specs: &[TaskSpec], store: &dyn ImageStore, tracker: &ProgressTracker)
        -> RunReport;
}

/// Build the scheduler for `mode`.
pub fn scheduler_for(mode: Mode, threads: usize, policy: FailurePolicy) -> Box<dyn Scheduler> {
    match mode {
        Mode::Sequential => Box::new(SequentialEngine::new(policy)),
        Mode::Bsp => Box::new(BspEngine::new(threads, policy)),
        Mode::Pipeline => Box::new(PipelineEngine::new(threads, policy)),
    }
}

//! Single-threaded scheduling.
//!
//! Every task runs to completion before the next one is loaded, and every
//! effect covers the full image in one pass. The other engines must match
//! this one pixel for pixel.

use crate::core::config::{FailurePolicy, Mode};
use crate::core::error::ImageResult;
use crate::core::task::{ImageTask, StageTransition, TaskSpec};
use crate::execution::progress::ProgressTracker;
use crate::execution::report::{OutcomeLog, RunReport, TaskOutcome};
use crate::execution::scheduler::Scheduler;
use crate::io::store::ImageStore;
use std::time::Instant;

/// One thread, one effect at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialEngine {
    policy: FailurePolicy,
}

impl SequentialEngine {
    /// Create a sequential engine.
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }
}

impl Scheduler for SequentialEngine {
    fn mode(&self) -> Mode {
        Mode::Sequential
    }

    fn threads(&self) -> usize {
        1
    }

    fn run(
        &self,
        specs: &[TaskSpec],
        store: &dyn ImageStore,
        tracker: &ProgressTracker,
    ) -> RunReport {
        let start = Instant::now();
        let mut log = OutcomeLog::new(specs, self.policy, tracker);

        for spec in specs {
            if !log.should_continue() {
                break;
            }

            let outcome = match ImageTask::load(spec, store) {
                Ok(mut task) => match run_stages(&mut task, tracker) {
                    Ok(()) => TaskOutcome::persist(&task, store),
                    Err(error) => {
                        TaskOutcome::failed(task.index, task.destination().clone(), error.into())
                    }
                },
                Err(error) => TaskOutcome::failed(spec.index, &spec.output, error),
            };
            log.record(outcome);
        }

        log.finish(Mode::Sequential, 1, start.elapsed(), 0)
    }
}

fn run_stages(task: &mut ImageTask, tracker: &ProgressTracker) -> ImageResult<()> {
    let bounds = task.bounds();
    let mut stage = 0;
    loop {
        let effect = task.effect(stage);
        task.image.apply(effect, bounds)?;
        tracker.stage_completed(task.index, stage, effect, task.stage_count());

        match task.finish_stage(stage)? {
            StageTransition::Next(next) => stage = next,
            StageTransition::Done => return Ok(()),
        }
    }
}

//! Pipelined scheduling.
//!
//! ```text
//! generator ──pending──▶ stage-workers (N) ──finished──▶ aggregator
//!     │                       │                              │
//!     └────────────── results ┴──────────────────────────────┴──▶ driver
//! ```
//!
//! The generator loads tasks; each stage-worker runs one task at a time,
//! fanning every stage out to one scoped thread per partition and waiting
//! for all of them before swapping; the aggregator saves finished tasks. The
//! driver (the calling thread) collects one outcome per task. Tasks are not
//! kept in lock-step with each other, only a task's own stages are ordered.
//!
//! Shutdown is by disconnection. Once the run is cancelled the generator
//! stops loading and stage-workers abandon their task between stages; the
//! driver keeps recording until every sender is gone, so a task the
//! aggregator saved after cancellation is still reported as saved.

use crate::core::config::{FailurePolicy, Mode};
use crate::core::error::ImageResult;
use crate::core::region::partitions;
use crate::core::task::{ImageTask, StageTransition, TaskSpec};
use crate::execution::progress::ProgressTracker;
use crate::execution::report::{OutcomeLog, RunReport, TaskOutcome};
use crate::execution::scheduler::Scheduler;
use crate::execution::sync::{scatter_gather, Tally};
use crate::io::store::ImageStore;
use crossbeam::channel::{bounded, unbounded};
use std::time::Instant;

/// Generator, stage-worker pool and aggregator connected by channels.
#[derive(Debug, Clone, Copy)]
pub struct PipelineEngine {
    threads: usize,
    policy: FailurePolicy,
}

impl PipelineEngine {
    /// Create an engine with `threads` stage-workers and partitions per stage.
    pub fn new(threads: usize, policy: FailurePolicy) -> Self {
        Self {
            threads: threads.max(1),
            policy,
        }
    }
}

impl Scheduler for PipelineEngine {
    fn mode(&self) -> Mode {
        Mode::Pipeline
    }

    fn threads(&self) -> usize {
        self.threads
    }

    fn run(
        &self,
        specs: &[TaskSpec],
        store: &dyn ImageStore,
        tracker: &ProgressTracker,
    ) -> RunReport {
        let start = Instant::now();
        let threads = self.threads;
        let mut log = OutcomeLog::new(specs, self.policy, tracker);

        let (pending_tx, pending_rx) = bounded::<ImageTask>(threads);
        let (finished_tx, finished_rx) = bounded::<ImageTask>(threads);
        let (result_tx, result_rx) = unbounded::<TaskOutcome>();

        std::thread::scope(|scope| {
            // Generator
            let generator_results = result_tx.clone();
            scope.spawn(move || {
                for spec in specs {
                    if tracker.is_cancelled() {
                        break;
                    }
                    let sent = match ImageTask::load(spec, store) {
                        Ok(task) => pending_tx.send(task).is_ok(),
                        Err(error) => generator_results
                            .send(TaskOutcome::failed(spec.index, &spec.output, error))
                            .is_ok(),
                    };
                    if !sent {
                        break;
                    }
                }
            });

            // Stage-workers
            for _ in 0..threads {
                let pending_rx = pending_rx.clone();
                let finished_tx = finished_tx.clone();
                let worker_results = result_tx.clone();
                scope.spawn(move || {
                    for mut task in pending_rx.iter() {
                        if tracker.is_cancelled() {
                            break;
                        }
                        let sent = match run_stages(&mut task, threads, tracker) {
                            Ok(true) => finished_tx.send(task).is_ok(),
                            Ok(false) => break,
                            Err(error) => {
                                let destination = task.destination().clone();
                                worker_results
                                    .send(TaskOutcome::failed(task.index, destination, error.into()))
                                    .is_ok()
                            }
                        };
                        if !sent {
                            break;
                        }
                    }
                });
            }
            drop(pending_rx);
            drop(finished_tx);

            // Aggregator
            let aggregator_results = result_tx.clone();
            scope.spawn(move || {
                for task in finished_rx.iter() {
                    let outcome = TaskOutcome::persist(&task, store);
                    if aggregator_results.send(outcome).is_err() {
                        break;
                    }
                }
            });
            drop(result_tx);

            // Driver
            let mut completed = Tally::new(specs.len());
            if !specs.is_empty() {
                for outcome in result_rx.iter() {
                    log.record(outcome);
                    if completed.record() {
                        break;
                    }
                }
            }
            drop(result_rx);
        });

        log.finish(Mode::Pipeline, threads, start.elapsed(), 0)
    }
}

/// Run every stage of `task`, each fanned out over `threads` partitions.
///
/// Returns `false` if the run was cancelled before the last stage finished.
fn run_stages(task: &mut ImageTask, threads: usize, tracker: &ProgressTracker) -> ImageResult<bool> {
    let regions = partitions(task.bounds(), threads);
    let mut stage = 0;
    loop {
        if tracker.is_cancelled() {
            log::debug!("Task {} abandoned before stage {stage}", task.index);
            return Ok(false);
        }
        let effect = task.effect(stage);
        let bands = task.image.checkout_all(&regions)?;

        let input = task.image.share_input();
        let bands = scatter_gather(bands, |mut band| {
            effect.apply(&input, &mut band);
            band
        });
        drop(input);

        for band in bands {
            task.image.checkin(band)?;
        }
        tracker.stage_completed(task.index, stage, effect, task.stage_count());

        match task.finish_stage(stage)? {
            StageTransition::Next(next) => stage = next,
            StageTransition::Done => return Ok(true),
        }
    }
}

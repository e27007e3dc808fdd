//! Bulk-synchronous scheduling.
//!
//! `N` persistent workers move through the task list in lock-step. Each round
//! covers one `(task, stage)` pair: every worker applies the stage's effect
//! to its own band of the image, then arrives at a shared [`RoundBarrier`].
//! The last worker to arrive closes the round (checks the bands back in,
//! then swaps buffers or saves the task) and prepares the next one before
//! anyone is released. Each worker picks up its next assignment under the
//! same lock acquisition that released it, so no worker ever reads the
//! task and stage cursors unsynchronized.
//!
//! Source images are loaded up front with rayon; tasks that fail to load
//! are reported before the first round and never enter the rotation.

use crate::core::config::{FailurePolicy, Mode};
use crate::core::error::TaskError;
use crate::core::image::{Band, Plane};
use crate::core::region::partitions;
use crate::core::task::{ImageTask, StageTransition, TaskSpec};
use crate::execution::progress::ProgressTracker;
use crate::execution::report::{OutcomeLog, RunReport, TaskOutcome};
use crate::execution::scheduler::Scheduler;
use crate::execution::sync::RoundBarrier;
use crate::filters::effect::Effect;
use crate::io::store::ImageStore;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Persistent workers synchronized by a global barrier.
#[derive(Debug, Clone, Copy)]
pub struct BspEngine {
    threads: usize,
    policy: FailurePolicy,
}

impl BspEngine {
    /// Create an engine with `threads` workers (at least one).
    pub fn new(threads: usize, policy: FailurePolicy) -> Self {
        Self {
            threads: threads.max(1),
            policy,
        }
    }
}

impl Scheduler for BspEngine {
    fn mode(&self) -> Mode {
        Mode::Bsp
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
        let mut log = OutcomeLog::new(specs, self.policy, tracker);

        let loaded: Vec<Result<ImageTask, TaskError>> = specs
            .par_iter()
            .map(|spec| ImageTask::load(spec, store))
            .collect();

        let mut tasks = VecDeque::with_capacity(loaded.len());
        for (spec, result) in specs.iter().zip(loaded) {
            match result {
                Ok(task) => tasks.push_back(task),
                Err(error) => {
                    log.record(TaskOutcome::failed(spec.index, &spec.output, error));
                }
            }
        }
        log::debug!("BSP: {} task(s) loaded for {} worker(s)", tasks.len(), self.threads);

        let mut context = BspContext {
            tasks,
            stage: 0,
            pending: Vec::new(),
            returned: Vec::with_capacity(self.threads),
            rounds: 0,
            threads: self.threads,
            store,
            tracker,
            log,
        };
        context.prepare_round();

        let barrier = RoundBarrier::new(self.threads, context);
        std::thread::scope(|scope| {
            for worker in 0..self.threads {
                let barrier = &barrier;
                scope.spawn(move || run_worker(barrier, worker));
            }
        });

        let context = barrier.into_state();
        context
            .log
            .finish(Mode::Bsp, self.threads, start.elapsed(), context.rounds)
    }
}

fn run_worker(barrier: &RoundBarrier<BspContext<'_>>, worker: usize) {
    let mut next = barrier.with_state(|context| context.take_assignment(worker));
    while let Some(assignment) = next {
        let band = assignment.execute();
        next = barrier.arrive(
            |context| context.returned.push(band),
            BspContext::complete_round,
            |context| context.take_assignment(worker),
        );
    }
}

/// One worker's share of a round.
struct Assignment {
    effect: Effect,
    input: Arc<Plane>,
    band: Band,
}

impl Assignment {
    fn execute(self) -> Band {
        let Assignment {
            effect,
            input,
            mut band,
        } = self;
        effect.apply(&input, &mut band);
        band
    }
}

/// State shared by every worker, reachable only through the barrier.
struct BspContext<'a> {
    /// Loaded tasks not yet finished; the front one is in progress.
    tasks: VecDeque<ImageTask>,
    /// Stage of the front task.
    stage: usize,
    /// Next assignment per worker; all `None` once the run is over.
    pending: Vec<Option<Assignment>>,
    /// Bands deposited in the current round.
    returned: Vec<Band>,
    rounds: usize,
    threads: usize,
    store: &'a dyn ImageStore,
    tracker: &'a ProgressTracker,
    log: OutcomeLog<'a>,
}

impl BspContext<'_> {
    fn take_assignment(&mut self, worker: usize) -> Option<Assignment> {
        self.pending.get_mut(worker).and_then(Option::take)
    }

    /// Run by the last worker to arrive.
    fn complete_round(&mut self) {
        self.rounds += 1;

        if let Some(task) = self.tasks.front_mut() {
            let stage = self.stage;
            let checked_in = self
                .returned
                .drain(..)
                .try_for_each(|band| task.image.checkin(band));

            let transition = checked_in.and_then(|()| {
                self.tracker
                    .stage_completed(task.index, stage, task.effect(stage), task.stage_count());
                task.finish_stage(stage)
            });

            match transition {
                Ok(StageTransition::Next(next)) => self.stage = next,
                Ok(StageTransition::Done) => {
                    let outcome = TaskOutcome::persist(task, self.store);
                    self.log.record(outcome);
                    self.next_task();
                }
                Err(error) => {
                    let outcome =
                        TaskOutcome::failed(task.index, task.destination().clone(), error.into());
                    self.log.record(outcome);
                    self.next_task();
                }
            }
        }

        self.prepare_round();
    }

    fn next_task(&mut self) {
        self.tasks.pop_front();
        self.stage = 0;
    }

    /// Hand every worker its band of the next `(task, stage)` pair, or
    /// nothing when the run is over.
    fn prepare_round(&mut self) {
        self.pending.clear();

        while self.log.should_continue() {
            let Some(task) = self.tasks.front_mut() else {
                break;
            };

            let regions = partitions(task.bounds(), self.threads);
            match task.image.checkout_all(&regions) {
                Ok(bands) => {
                    let effect = task.effect(self.stage);
                    let input = task.image.share_input();
                    log::debug!(
                        "BSP round {}: task {} stage {} ({effect})",
                        self.rounds + 1,
                        task.index,
                        self.stage
                    );
                    self.pending = bands
                        .into_iter()
                        .map(|band| {
                            Some(Assignment {
                                effect,
                                input: Arc::clone(&input),
                                band,
                            })
                        })
                        .collect();
                    return;
                }
                Err(error) => {
                    let outcome =
                        TaskOutcome::failed(task.index, task.destination().clone(), error.into());
                    self.log.record(outcome);
                    self.next_task();
                }
            }
        }
    }
}

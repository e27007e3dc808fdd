//! Per-task outcomes and run reports.
//!
//! Every engine records exactly one [`TaskOutcome`] per task through an
//! [`OutcomeLog`]. The log applies the run's [`FailurePolicy`]: under
//! `Abort` the first failure cancels the run and every task that never got
//! an outcome is reported as [`TaskError::Aborted`].

use crate::core::config::{FailurePolicy, Mode};
use crate::core::error::TaskError;
use crate::core::task::{ImageTask, TaskSpec};
use crate::execution::progress::ProgressTracker;
use crate::io::store::ImageStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// How a task ended.
#[derive(Debug)]
pub enum TaskStatus {
    /// The final image was saved.
    Saved {
        /// Effects applied.
        stages: usize,
        /// Buffer swaps performed.
        swaps: usize,
    },
    /// The task did not produce an image.
    Failed(TaskError),
}

/// The result of one task.
#[derive(Debug)]
pub struct TaskOutcome {
    /// Task index.
    pub index: usize,
    /// Where the result was (or would have been) written.
    pub destination: PathBuf,
    /// How it ended.
    pub status: TaskStatus,
}

impl TaskOutcome {
    /// Outcome of a task whose image was saved.
    pub fn saved(task: &ImageTask) -> Self {
        Self {
            index: task.index,
            destination: task.destination().clone(),
            status: TaskStatus::Saved {
                stages: task.stage_count(),
                swaps: task.image.swap_count(),
            },
        }
    }

    /// Outcome of a failed task.
    pub fn failed(index: usize, destination: impl Into<PathBuf>, error: TaskError) -> Self {
        Self {
            index,
            destination: destination.into(),
            status: TaskStatus::Failed(error),
        }
    }

    /// Save a finished task and describe the result.
    pub fn persist(task: &ImageTask, store: &dyn ImageStore) -> Self {
        match task.save(store) {
            Ok(()) => Self::saved(task),
            Err(error) => Self::failed(task.index, task.destination().clone(), error),
        }
    }

    /// Whether the image was saved.
    pub fn is_saved(&self) -> bool {
        matches!(self.status, TaskStatus::Saved { .. })
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&TaskError> {
        match &self.status {
            TaskStatus::Failed(error) => Some(error),
            TaskStatus::Saved { .. } => None,
        }
    }
}

/// Collects outcomes while a run is in flight.
pub struct OutcomeLog<'a> {
    policy: FailurePolicy,
    planned: Vec<(usize, PathBuf)>,
    outcomes: BTreeMap<usize, TaskOutcome>,
    tracker: &'a ProgressTracker,
}

impl<'a> OutcomeLog<'a> {
    /// Start a log for `specs`.
    pub fn new(specs: &[TaskSpec], policy: FailurePolicy, tracker: &'a ProgressTracker) -> Self {
        Self {
            policy,
            planned: specs
                .iter()
                .map(|spec| (spec.index, spec.output.clone()))
                .collect(),
            outcomes: BTreeMap::new(),
            tracker,
        }
    }

    /// Record an outcome; returns `false` once the run should stop.
    pub fn record(&mut self, outcome: TaskOutcome) -> bool {
        match &outcome.status {
            TaskStatus::Saved { stages, .. } => {
                log::info!(
                    "Task {} saved to {} after {stages} stage(s)",
                    outcome.index,
                    outcome.destination.display()
                );
                self.tracker
                    .task_saved(outcome.index, outcome.destination.clone());
            }
            TaskStatus::Failed(error) => {
                log::warn!("Task {} failed: {error}", outcome.index);
                self.tracker.task_failed(outcome.index, error.to_string());
                if self.policy == FailurePolicy::Abort {
                    self.tracker.cancel();
                }
            }
        }

        self.outcomes.insert(outcome.index, outcome);
        self.should_continue()
    }

    /// Whether more work should be started.
    pub fn should_continue(&self) -> bool {
        !self.tracker.is_cancelled()
    }

    /// Close the log; tasks without an outcome are reported as aborted.
    pub fn finish(mut self, mode: Mode, threads: usize, duration: Duration, rounds: usize) -> RunReport {
        let outcomes: Vec<TaskOutcome> = std::mem::take(&mut self.planned)
            .into_iter()
            .map(|(index, destination)| {
                self.outcomes
                    .remove(&index)
                    .unwrap_or_else(|| TaskOutcome::failed(index, destination, TaskError::Aborted))
            })
            .collect();

        let tasks_saved = outcomes.iter().filter(|o| o.is_saved()).count();
        let tasks_aborted = outcomes
            .iter()
            .filter(|o| o.error().is_some_and(TaskError::is_aborted))
            .count();

        let stats = RunStats {
            duration,
            tasks_saved,
            tasks_failed: outcomes.len() - tasks_saved,
            tasks_aborted,
            rounds,
        };
        log::info!(
            "{mode} run finished in {:.2?}: {} saved, {} failed",
            duration,
            stats.tasks_saved,
            stats.tasks_failed
        );
        self.tracker.complete();

        RunReport {
            mode,
            threads,
            outcomes,
            stats,
        }
    }
}

/// Run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Wall-clock time of the run.
    pub duration: Duration,
    /// Tasks whose image was saved.
    pub tasks_saved: usize,
    /// Tasks that failed, aborted ones included.
    pub tasks_failed: usize,
    /// Tasks that never finished because the run was cancelled.
    pub tasks_aborted: usize,
    /// Barrier rounds executed (BSP only).
    pub rounds: usize,
}

/// The result of a run: one outcome per task, in task order.
#[derive(Debug)]
pub struct RunReport {
    /// Scheduling model used.
    pub mode: Mode,
    /// Worker count used.
    pub threads: usize,
    /// Outcomes ordered by task index.
    pub outcomes: Vec<TaskOutcome>,
    /// Run statistics.
    pub stats: RunStats,
}

impl RunReport {
    /// Whether every task was saved.
    pub fn is_success(&self) -> bool {
        self.stats.tasks_failed == 0
    }

    /// Failed tasks.
    pub fn failures(&self) -> impl Iterator<Item = (&TaskOutcome, &TaskError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.error().map(|error| (outcome, error)))
    }

    /// Outcome of a task by index.
    pub fn outcome(&self, index: usize) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|outcome| outcome.index == index)
    }

    /// Serializable summary of the run.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            mode: self.mode,
            threads: self.threads,
            duration_ms: self.stats.duration.as_millis() as u64,
            tasks_saved: self.stats.tasks_saved,
            tasks_failed: self.stats.tasks_failed,
            rounds: self.stats.rounds,
            tasks: self.outcomes.iter().map(TaskSummary::from).collect(),
        }
    }

    /// The summary as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }
}

/// Serializable view of a [`RunReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// Scheduling model used.
    pub mode: Mode,
    /// Worker count used.
    pub threads: usize,
    /// Wall-clock time in milliseconds.
    pub duration_ms: u64,
    /// Tasks saved.
    pub tasks_saved: usize,
    /// Tasks failed.
    pub tasks_failed: usize,
    /// Barrier rounds (BSP only).
    pub rounds: usize,
    /// Per-task results.
    pub tasks: Vec<TaskSummary>,
}

/// Serializable view of a [`TaskOutcome`].
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    /// Task index.
    pub index: usize,
    /// Destination path.
    pub destination: PathBuf,
    /// `saved` or `failed`.
    pub status: &'static str,
    /// Stages applied, when saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<usize>,
    /// Swaps performed, when saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swaps: Option<usize>,
    /// Error message, when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&TaskOutcome> for TaskSummary {
    fn from(outcome: &TaskOutcome) -> Self {
        let (status, stages, swaps, error) = match &outcome.status {
            TaskStatus::Saved { stages, swaps } => ("saved", Some(*stages), Some(*swaps), None),
            TaskStatus::Failed(error) => ("failed", None, None, Some(error.to_string())),
        };
        Self {
            index: outcome.index,
            destination: outcome.destination.clone(),
            status,
            stages,
            swaps,
            error,
        }
    }
}

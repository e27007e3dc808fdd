//! Execution engine implementation.
//!
//! The engine turns a [`RunConfig`] into a run: it validates the config,
//! reads and expands the job list, builds the configured scheduler and
//! drives it with a progress tracker.

use crate::core::config::RunConfig;
use crate::core::error::LockstepError;
use crate::core::task::TaskSpec;
use crate::execution::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
use crate::execution::report::RunReport;
use crate::execution::scheduler::scheduler_for;
use crate::io::jobs::{expand, read_jobs};
use crate::io::store::ImageStore;
use std::sync::Arc;

/// Per-run options that are not part of the persisted configuration.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Progress callback.
    pub progress_callback: Option<Arc<ProgressCallback>>,
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl RunOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }
}

/// The execution engine.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    config: RunConfig,
    options: RunOptions,
}

impl ExecutionEngine {
    /// Create an engine for `config`.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            options: RunOptions::default(),
        }
    }

    /// Set run options.
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// The configuration this engine runs.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Validate the config and expand the job list into task specs.
    pub fn plan(&self) -> Result<Vec<TaskSpec>, LockstepError> {
        self.config.validate()?;
        let resolutions = self.config.resolutions()?;

        let job_path = self.config.job_path();
        let jobs = read_jobs(&job_path)?;
        log::info!(
            "Read {} job(s) from {}; resolutions: {}",
            jobs.len(),
            job_path.display(),
            resolutions.join(", ")
        );

        Ok(expand(&jobs, &resolutions, &self.config.layout()))
    }

    /// Plan and run every task.
    ///
    /// Only configuration and job list problems are returned as errors;
    /// task failures are part of the report.
    pub fn execute(&self, store: &dyn ImageStore) -> Result<RunReport, LockstepError> {
        let specs = self.plan()?;
        Ok(self.run(&specs, store))
    }

    /// Run already planned tasks with the configured scheduler.
    pub fn run(&self, specs: &[TaskSpec], store: &dyn ImageStore) -> RunReport {
        let scheduler = scheduler_for(
            self.config.mode,
            self.config.threads,
            self.config.failure_policy,
        );

        let mut tracker = ProgressTracker::new(specs.len());
        if let Some(callback) = &self.options.progress_callback {
            let callback = callback.clone();
            tracker = tracker.with_callback(Box::new(move |update| callback(update)));
        }
        tracker.start(scheduler.mode(), scheduler.threads());

        log::info!(
            "Running {} task(s) with the {} scheduler on {} thread(s)",
            specs.len(),
            scheduler.mode(),
            scheduler.threads()
        );
        scheduler.run(specs, store, &tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Mode;
    use crate::core::error::{ConfigError, JobError};
    use crate::core::image::Plane;
    use crate::io::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_threads_is_a_run_error() {
        let engine = ExecutionEngine::new(RunConfig::new().with_threads(0));
        let err = engine.execute(&MemoryStore::new()).unwrap_err();
        assert!(matches!(err, LockstepError::Config(ConfigError::ZeroThreads)));
    }

    #[test]
    fn test_missing_job_list_is_a_run_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ExecutionEngine::new(RunConfig::new().with_data_root(dir.path()));
        let err = engine.execute(&MemoryStore::new()).unwrap_err();
        assert!(matches!(err, LockstepError::Job(JobError::Read { .. })));
    }

    #[test]
    fn test_plan_and_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("effects.txt"),
            r#"{"inPath": "a.png", "outPath": "a.png", "effects": ["G", "B"]}"#,
        )
        .unwrap();

        let config = RunConfig::new()
            .with_mode(Mode::Bsp)
            .with_threads(2)
            .with_data_dirs("small+big")
            .with_data_root(dir.path());
        let layout = config.layout();

        let store = MemoryStore::new()
            .with(layout.input_path("small", "a.png"), Plane::new(4, 3))
            .with(layout.input_path("big", "a.png"), Plane::new(8, 6));

        let updates = Arc::new(AtomicUsize::new(0));
        let updates_clone = updates.clone();
        let options = RunOptions::new().with_progress(move |_| {
            updates_clone.fetch_add(1, Ordering::Relaxed);
        });

        let report = ExecutionEngine::new(config).with_options(options).execute(&store).unwrap();
        assert!(report.is_success());
        assert_eq!(report.stats.rounds, 4);
        assert!(store.contains(layout.output_path("big", "a.png")));
        assert!(updates.load(Ordering::Relaxed) > 0);
    }
}

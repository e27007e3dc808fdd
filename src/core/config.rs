//! Run configuration.
//!
//! A run is described by a [`RunConfig`]: which scheduling model to use, how
//! many workers, which resolution directories to cross with the job list and
//! where the data lives. Configs load from TOML and can be adjusted with the
//! `with_*` builder methods (the CLI applies its flags that way).
//!
//! ```toml
//! mode = "bsp"
//! threads = 6
//! data_dirs = "small+big"
//! data_root = "../data"
//! failure_policy = "abort"
//! ```

use crate::core::error::ConfigError;
use crate::io::jobs::DataLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Scheduling model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One thread, one effect at a time.
    #[default]
    Sequential,
    /// Persistent workers in global lock-step.
    Bsp,
    /// Generator, stage-worker pool and aggregator connected by channels.
    Pipeline,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "seq" | "sequential" => Ok(Mode::Sequential),
            "bsp" => Ok(Mode::Bsp),
            "pipeline" => Ok(Mode::Pipeline),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sequential => write!(f, "sequential"),
            Mode::Bsp => write!(f, "bsp"),
            Mode::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// What happens to the rest of a run when one task fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and keep processing other tasks.
    #[default]
    Continue,
    /// Stop at the first failure; unfinished tasks are reported as aborted.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            _ => Err(ConfigError::UnknownFailurePolicy(s.to_string())),
        }
    }
}

/// Everything needed to start a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Scheduling model.
    pub mode: Mode,
    /// Worker count (BSP workers, pipeline stage-workers and partitions).
    pub threads: usize,
    /// `+`-separated resolution directory names.
    pub data_dirs: String,
    /// Root holding `effects.txt`, `in/` and `out/`.
    pub data_root: PathBuf,
    /// Job list override; defaults to `<data_root>/effects.txt`.
    pub job_file: Option<PathBuf>,
    /// Failure handling.
    pub failure_policy: FailurePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Sequential,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            data_dirs: "small".to_string(),
            data_root: PathBuf::from("../data"),
            job_file: None,
            failure_policy: FailurePolicy::Continue,
        }
    }
}

impl RunConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source, path)
    }

    /// Set the scheduling model.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the worker count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the resolution directory list.
    pub fn with_data_dirs(mut self, data_dirs: impl Into<String>) -> Self {
        self.data_dirs = data_dirs.into();
        self
    }

    /// Set the data root.
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    /// Read jobs from a specific file.
    pub fn with_job_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.job_file = Some(path.into());
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Check the configuration before a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        self.resolutions().map(|_| ())
    }

    /// The resolution directories, in order.
    pub fn resolutions(&self) -> Result<Vec<String>, ConfigError> {
        crate::io::jobs::parse_resolutions(&self.data_dirs)
    }

    /// Path layout under the data root.
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_root)
    }

    /// Where the job list is read from.
    pub fn job_path(&self) -> PathBuf {
        self.job_file
            .clone()
            .unwrap_or_else(|| self.layout().job_file())
    }
}

//! Error types for Lockstep.
//!
//! Uses thiserror for structured errors with context. Errors are split by
//! where they surface:
//! - Run-level errors (configuration, job list) stop a run before any task starts
//! - Task-level errors are recorded in the run report for the affected task only
//! - Image errors describe decode/encode failures and double-buffer misuse

use crate::core::region::Region;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Lockstep.
#[derive(Error, Debug)]
pub enum LockstepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job list error: {0}")]
    Job(#[from] JobError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors in the run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown scheduling mode '{0}' (expected sequential, bsp or pipeline)")]
    UnknownMode(String),

    #[error("Unknown failure policy '{0}' (expected continue or abort)")]
    UnknownFailurePolicy(String),

    #[error("Thread count must be at least 1")]
    ZeroThreads,

    #[error("No resolution directories given in '{0}'")]
    NoResolutions(String),

    #[error("Empty resolution directory in '{0}'")]
    EmptyResolution(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors reading the job list.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Failed to read job list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed job #{index} in job list: {source}")]
    Parse {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from image storage and the double buffer.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to load image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No image stored at {0}")]
    NotFound(PathBuf),

    #[error("Region {region} lies outside the {width}x{height} image")]
    OutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("Rows of region {0} are already checked out")]
    BandOverlap(Region),

    #[error("Band {0} does not belong to this image")]
    ForeignBand(Region),

    #[error("{0} band(s) still checked out of the output buffer")]
    BandsOutstanding(usize),
}

/// Errors that fail a single task.
///
/// A task error never stops other tasks unless the run uses
/// [`FailurePolicy::Abort`](crate::core::config::FailurePolicy::Abort).
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Unknown effect code '{code}'")]
    UnknownEffect { code: String },

    #[error("Task has no effects to apply")]
    NoEffects,

    #[error("Load failed: {0}")]
    Load(#[source] ImageError),

    #[error("Processing failed: {0}")]
    Image(#[from] ImageError),

    #[error("Save failed: {0}")]
    Save(#[source] ImageError),

    #[error("Run aborted before this task completed")]
    Aborted,
}

// ============================================================================
// Error Utilities
// ============================================================================

impl TaskError {
    /// Check if the task never ran because another task failed first.
    pub fn is_aborted(&self) -> bool {
        matches!(self, TaskError::Aborted)
    }
}

/// Result type alias for image operations.
pub type ImageResult<T> = Result<T, ImageError>;

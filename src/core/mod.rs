//! Core types for the Lockstep image processing system.
//!
//! This module contains the foundational types every engine shares:
//! - Regions and how an image is partitioned among workers
//! - Pixel planes and the double-buffered image
//! - Tasks and their stage transitions
//! - Run configuration
//! - Error types

pub mod config;
pub mod error;
pub mod image;
pub mod region;
pub mod task;

// Re-export commonly used types
pub use config::{FailurePolicy, Mode, RunConfig};
pub use error::{ConfigError, ImageError, JobError, LockstepError, TaskError};
pub use self::image::{Band, Image, Pixel, Plane};
pub use region::{partition, partitions, Region};
pub use task::{ImageTask, StageTransition, TaskSpec};

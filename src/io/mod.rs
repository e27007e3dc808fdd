//! Job lists, data layout and image storage.

pub mod jobs;
pub mod store;

pub use jobs::{expand, parse_jobs, read_jobs, DataLayout, JobSpec};
pub use store::{ImageStore, MemoryStore, PngStore};

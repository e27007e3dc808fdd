//! Job lists and their expansion into tasks.
//!
//! A job list is a stream of JSON objects, one per job:
//!
//! ```json
//! {"inPath": "IMG_2029.png", "outPath": "IMG_2029_Out.png", "effects": ["S", "B", "E"]}
//! {"inPath": "IMG_2030.png", "outPath": "IMG_2030_Out.png", "effects": ["G"]}
//! ```
//!
//! Every job runs once per resolution directory. Effect codes stay as text
//! here; a job with an unknown code fails its tasks when they are loaded
//! instead of failing the whole list.

use crate::core::error::{ConfigError, JobError};
use crate::core::task::TaskSpec;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// One entry of the job list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Source file name, relative to a resolution directory.
    pub in_path: String,
    /// Destination file name, prefixed with the resolution on output.
    pub out_path: String,
    /// Effect codes in application order.
    pub effects: Vec<String>,
}

/// Parse a stream of JSON job objects.
pub fn parse_jobs<R: Read>(reader: R) -> Result<Vec<JobSpec>, JobError> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<JobSpec>()
        .enumerate()
        .map(|(index, job)| job.map_err(|source| JobError::Parse { index, source }))
        .collect()
}

/// Read and parse a job list file.
pub fn read_jobs(path: &Path) -> Result<Vec<JobSpec>, JobError> {
    let file = std::fs::File::open(path).map_err(|source| JobError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_jobs(std::io::BufReader::new(file))
}

/// Split a `+`-separated resolution list.
pub fn parse_resolutions(list: &str) -> Result<Vec<String>, ConfigError> {
    let trimmed = list.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::NoResolutions(list.to_string()));
    }

    trimmed
        .split('+')
        .map(|dir| match dir.trim() {
            "" => Err(ConfigError::EmptyResolution(list.to_string())),
            dir => Ok(dir.to_string()),
        })
        .collect()
}

/// Directory layout under the data root.
///
/// ```text
/// <root>/effects.txt
/// <root>/in/<resolution>/<inPath>
/// <root>/out/<resolution>_<outPath>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Create a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default job list location.
    pub fn job_file(&self) -> PathBuf {
        self.root.join("effects.txt")
    }

    /// Source path of a job at a resolution.
    pub fn input_path(&self, resolution: &str, in_path: &str) -> PathBuf {
        self.root.join("in").join(resolution).join(in_path)
    }

    /// Destination path of a job at a resolution.
    pub fn output_path(&self, resolution: &str, out_path: &str) -> PathBuf {
        self.root.join("out").join(format!("{resolution}_{out_path}"))
    }
}

/// Cross resolutions with jobs, resolution-major.
pub fn expand(jobs: &[JobSpec], resolutions: &[String], layout: &DataLayout) -> Vec<TaskSpec> {
    resolutions
        .iter()
        .flat_map(|resolution| jobs.iter().map(move |job| (resolution, job)))
        .enumerate()
        .map(|(index, (resolution, job))| {
            TaskSpec::new(
                index,
                layout.input_path(resolution, &job.in_path),
                layout.output_path(resolution, &job.out_path),
                job.effects.clone(),
            )
        })
        .collect()
}

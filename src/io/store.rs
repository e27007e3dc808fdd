//! Image storage.
//!
//! Engines never touch the filesystem directly; they load and save planes
//! through an [`ImageStore`]. [`PngStore`] reads any format the `image` crate
//! decodes and always writes 16-bit PNG. [`MemoryStore`] keeps planes in a
//! map, which is what the engine tests run against.

use crate::core::error::ImageError;
use crate::core::image::Plane;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Loads source planes and saves result planes.
pub trait ImageStore: Send + Sync {
    /// Load the image at `path` as a 16-bit RGBA plane.
    fn load(&self, path: &Path) -> Result<Plane, ImageError>;

    /// Save `plane` to `path`.
    fn save(&self, plane: &Plane, path: &Path) -> Result<(), ImageError>;
}

/// Filesystem store backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngStore;

impl PngStore {
    /// Create a filesystem store.
    pub fn new() -> Self {
        Self
    }
}

impl ImageStore for PngStore {
    fn load(&self, path: &Path) -> Result<Plane, ImageError> {
        if !path.exists() {
            return Err(ImageError::NotFound(path.to_path_buf()));
        }

        let decoded = image::open(path).map_err(|source| ImageError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Plane::from_rgba16(&decoded.into_rgba16()))
    }

    fn save(&self, plane: &Plane, path: &Path) -> Result<(), ImageError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ImageError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        plane
            .to_rgba16()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| ImageError::Encode {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// In-memory store keyed by path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    planes: Mutex<HashMap<PathBuf, Plane>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plane, builder style.
    pub fn with(self, path: impl Into<PathBuf>, plane: Plane) -> Self {
        self.insert(path, plane);
        self
    }

    /// Store a plane under `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, plane: Plane) {
        self.planes.lock().insert(path.into(), plane);
    }

    /// A copy of the plane stored under `path`.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Plane> {
        self.planes.lock().get(path.as_ref()).cloned()
    }

    /// Whether anything is stored under `path`.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.planes.lock().contains_key(path.as_ref())
    }

    /// Number of stored planes.
    pub fn len(&self) -> usize {
        self.planes.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.planes.lock().is_empty()
    }
}

impl ImageStore for MemoryStore {
    fn load(&self, path: &Path) -> Result<Plane, ImageError> {
        self.get(path)
            .ok_or_else(|| ImageError::NotFound(path.to_path_buf()))
    }

    fn save(&self, plane: &Plane, path: &Path) -> Result<(), ImageError> {
        self.insert(path, plane.clone());
        Ok(())
    }
}

//! Tasks: one image, an ordered list of effects and a destination.
//!
//! A [`TaskSpec`] is the planned form produced from the job list; an
//! [`ImageTask`] is the loaded form an engine drives through its stages.

use crate::core::error::{ImageResult, TaskError};
use crate::core::image::Image;
use crate::core::region::Region;
use crate::filters::effect::Effect;
use crate::io::store::ImageStore;
use std::path::PathBuf;

/// A planned task: where to read, where to write, what to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Position in the expanded task list.
    pub index: usize,
    /// Source image.
    pub input: PathBuf,
    /// Destination image.
    pub output: PathBuf,
    /// Effect codes as written in the job list.
    pub effect_codes: Vec<String>,
}

impl TaskSpec {
    /// Create a task spec.
    pub fn new(
        index: usize,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        effect_codes: Vec<String>,
    ) -> Self {
        Self {
            index,
            input: input.into(),
            output: output.into(),
            effect_codes,
        }
    }

    /// Parse the effect codes.
    pub fn effects(&self) -> Result<Vec<Effect>, TaskError> {
        let effects = Effect::parse_all(&self.effect_codes)?;
        if effects.is_empty() {
            return Err(TaskError::NoEffects);
        }
        Ok(effects)
    }
}

/// What comes after a finished stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTransition {
    /// Buffers were swapped; run this stage next.
    Next(usize),
    /// The last stage finished; the output plane holds the result.
    Done,
}

/// A loaded task.
#[derive(Debug)]
pub struct ImageTask {
    /// Position in the expanded task list.
    pub index: usize,
    /// The double-buffered image.
    pub image: Image,
    effects: Vec<Effect>,
    destination: PathBuf,
}

impl ImageTask {
    /// Create a task; `effects` must not be empty.
    pub fn new(
        index: usize,
        image: Image,
        effects: Vec<Effect>,
        destination: impl Into<PathBuf>,
    ) -> Result<Self, TaskError> {
        if effects.is_empty() {
            return Err(TaskError::NoEffects);
        }
        Ok(Self {
            index,
            image,
            effects,
            destination: destination.into(),
        })
    }

    /// Load the source image of `spec`.
    ///
    /// Effects are checked before the image is read so a bad job never
    /// touches the disk.
    pub fn load(spec: &TaskSpec, store: &dyn ImageStore) -> Result<Self, TaskError> {
        let effects = spec.effects()?;
        let plane = store.load(&spec.input).map_err(TaskError::Load)?;
        Self::new(spec.index, Image::new(plane), effects, &spec.output)
    }

    /// Number of stages.
    pub fn stage_count(&self) -> usize {
        self.effects.len()
    }

    /// Effect of `stage`.
    pub fn effect(&self, stage: usize) -> Effect {
        self.effects[stage]
    }

    /// All effects in stage order.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Where the result is saved.
    pub fn destination(&self) -> &PathBuf {
        &self.destination
    }

    /// Region covering the whole image.
    pub fn bounds(&self) -> Region {
        self.image.bounds()
    }

    /// Close `stage`: swap buffers unless it was the last one.
    pub fn finish_stage(&mut self, stage: usize) -> ImageResult<StageTransition> {
        if stage + 1 >= self.effects.len() {
            return Ok(StageTransition::Done);
        }
        self.image.swap()?;
        Ok(StageTransition::Next(stage + 1))
    }

    /// Write the final plane to the destination.
    pub fn save(&self, store: &dyn ImageStore) -> Result<(), TaskError> {
        let plane = self.image.output()?;
        store.save(plane, &self.destination).map_err(TaskError::Save)
    }
}

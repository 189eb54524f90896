//! Composable per-sample transform stages.
//!
//! ```text
//! transforms/
//! ├── geometric.rs   → spatial stages (resize, rescale, crops)
//! └── conversion.rs  → tensor encoding (normalization + channel-first layout)
//! ```
//!
//! Every stage consumes and produces a [`Sample`] and holds only its
//! construction-time parameters, so a configured pipeline can be shared
//! freely across threads.

pub mod conversion;
pub mod geometric;

pub use conversion::{ColorMode, ToTensor, ToTensorLab};
pub use geometric::{CenterCrop, OutputSize, RandomCrop, Rescale, Resize};

use crate::sample::Sample;
use anyhow::{Context, Result};

/// A stateless preprocessing stage, parameterized at construction time.
pub trait Transform: Send + Sync {
    /// Applies the transformation to the sample.
    fn apply(&self, sample: Sample) -> Result<Sample>;
}

/// An ordered pipeline of boxed transform stages, applied front to back.
///
/// # Example
/// ```ignore
/// let pipeline = Compose::new()
///     .then(Rescale::new(320)?)
///     .then(RandomCrop::new(288)?)
///     .then(ToTensorLab::new(ColorMode::Rgb));
/// ```
#[derive(Default)]
pub struct Compose {
    stages: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage to the end of the pipeline.
    pub fn then<T: Transform + 'static>(mut self, stage: T) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Transform for Compose {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        self.stages
            .iter()
            .enumerate()
            .try_fold(sample, |sample, (index, stage)| {
                stage.apply(sample).with_context(|| {
                    format!(
                        "Transform stage {} of {} failed",
                        index + 1,
                        self.stages.len()
                    )
                })
            })
    }
}

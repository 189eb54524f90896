//! Data loading and preprocessing for salient-object segmentation training.
//!
//! The crate exposes two layers that compose linearly:
//!
//! - [`SalObjDataset`]: an indexed loader that reads image/label/edge-map
//!   triples from disk and canonicalizes them into `(H, W, C)` f32 arrays.
//! - A chain of [`Transform`] stages ([`Resize`], [`Rescale`], [`CenterCrop`],
//!   [`RandomCrop`], [`ToTensor`], [`ToTensorLab`]) that resize, crop and
//!   encode a [`Sample`] into channel-first tensors for a training loop.
//!
//! ```ignore
//! let pipeline = Compose::new()
//!     .then(Rescale::new(320)?)
//!     .then(RandomCrop::new(288)?)
//!     .then(ToTensorLab::new(ColorMode::Rgb));
//!
//! let dataset = SalObjDataset::new(image_paths, Some(annotations))?
//!     .with_transform(pipeline);
//!
//! let sample = dataset.get(0)?; // image [3, 288, 288], label/edge [1, 288, 288]
//! ```
//!
//! Every lookup is independent and stateless; an external batching driver may
//! parallelize calls to [`Dataset::get`] across threads.

pub mod dataset;
pub mod io;
pub mod sample;
pub mod transforms;

pub use dataset::{AnnotationPaths, Dataset, SalObjDataset};
pub use sample::Sample;
pub use transforms::{
    CenterCrop, ColorMode, Compose, OutputSize, RandomCrop, Rescale, Resize, ToTensor,
    ToTensorLab, Transform,
};

use crate::sample::Sample;
use crate::transforms::Transform;
use anyhow::{anyhow, ensure, Context, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::{s, Array2, Array3, ArrayView2};
use rand::Rng;

// ============================================================================
// OutputSize
// ============================================================================

/// Target size for the spatial stages: a single integer means a square
/// target, a pair means an explicit `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    Square(u32),
    Exact { height: u32, width: u32 },
}

impl OutputSize {
    fn dims(self) -> (u32, u32) {
        match self {
            OutputSize::Square(side) => (side, side),
            OutputSize::Exact { height, width } => (height, width),
        }
    }
}

impl From<u32> for OutputSize {
    fn from(side: u32) -> Self {
        OutputSize::Square(side)
    }
}

impl From<(u32, u32)> for OutputSize {
    fn from((height, width): (u32, u32)) -> Self {
        OutputSize::Exact { height, width }
    }
}

fn ensure_positive(size: OutputSize) -> Result<OutputSize> {
    let (h, w) = size.dims();
    ensure!(
        h > 0 && w > 0,
        "Output dimensions must be positive (got {}x{})",
        h,
        w
    );
    Ok(size)
}

// ============================================================================
// Resampling helpers
// ============================================================================

/// Resamples one `(H, W)` plane through an f32 grayscale buffer.
fn resize_plane(
    plane: ArrayView2<f32>,
    out_h: u32,
    out_w: u32,
    filter: FilterType,
) -> Result<Array2<f32>> {
    let (h, w) = plane.dim();
    let raw: Vec<f32> = plane.iter().copied().collect();
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(w as u32, h as u32, raw)
            .ok_or_else(|| anyhow!("Plane buffer length does not match {}x{}", h, w))?;

    let resized = imageops::resize(&buffer, out_w, out_h, filter);
    Array2::from_shape_vec((out_h as usize, out_w as usize), resized.into_raw())
        .context("Resampled plane has unexpected length")
}

/// Resamples every channel of an `(H, W, C)` array to `(out_h, out_w, C)`.
fn resize_array(
    array: &Array3<f32>,
    out_h: u32,
    out_w: u32,
    filter: FilterType,
) -> Result<Array3<f32>> {
    let (_, _, channels) = array.dim();
    let mut out = Array3::zeros((out_h as usize, out_w as usize, channels));
    for c in 0..channels {
        let plane = resize_plane(array.slice(s![.., .., c]), out_h, out_w, filter)?;
        out.slice_mut(s![.., .., c]).assign(&plane);
    }
    Ok(out)
}

/// Shared resize policy: bilinear for the continuous image, nearest-neighbor
/// for the discrete masks so their value set is preserved.
fn resize_sample(sample: Sample, out_h: u32, out_w: u32) -> Result<Sample> {
    let Sample { image, label, edge } = sample;
    Ok(Sample {
        image: resize_array(&image, out_h, out_w, FilterType::Triangle)?,
        label: resize_array(&label, out_h, out_w, FilterType::Nearest)?,
        edge: resize_array(&edge, out_h, out_w, FilterType::Nearest)?,
    })
}

fn crop_window(array: &Array3<f32>, top: usize, left: usize, h: usize, w: usize) -> Array3<f32> {
    array.slice(s![top..top + h, left..left + w, ..]).to_owned()
}

// ============================================================================
// Resize
// ============================================================================

/// Resizes all three arrays to a fixed target size.
///
/// The image is resampled with bilinear interpolation; label and edge use
/// nearest-neighbor, so a binary mask stays binary.
#[derive(Debug, Clone, Copy)]
pub struct Resize {
    size: OutputSize,
}

impl Resize {
    pub fn new(size: impl Into<OutputSize>) -> Result<Self> {
        Ok(Self {
            size: ensure_positive(size.into())?,
        })
    }
}

impl Transform for Resize {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        let (out_h, out_w) = self.size.dims();
        resize_sample(sample, out_h, out_w)
    }
}

// ============================================================================
// Rescale
// ============================================================================

/// Resizes while preserving the aspect ratio when given a scalar target:
/// the shorter side is scaled to the target and the other proportionally,
/// floored to whole pixels. An explicit `(height, width)` pair resizes
/// exactly, like [`Resize`].
#[derive(Debug, Clone, Copy)]
pub struct Rescale {
    size: OutputSize,
}

impl Rescale {
    pub fn new(size: impl Into<OutputSize>) -> Result<Self> {
        Ok(Self {
            size: ensure_positive(size.into())?,
        })
    }
}

impl Transform for Rescale {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        let (h, w) = sample.dimensions();
        let (out_h, out_w) = match self.size {
            OutputSize::Square(side) => {
                if h > w {
                    let scaled = (side as f64 * h as f64 / w as f64).floor() as u32;
                    (scaled, side)
                } else {
                    let scaled = (side as f64 * w as f64 / h as f64).floor() as u32;
                    (side, scaled)
                }
            }
            OutputSize::Exact { height, width } => (height, width),
        };
        resize_sample(sample, out_h, out_w)
    }
}

// ============================================================================
// CenterCrop
// ============================================================================

/// Crops a centered window of the target size from all three arrays.
///
/// The target must not exceed the source dimensions; the offset is
/// `floor((H - new_H) / 2)`, `floor((W - new_W) / 2)`.
#[derive(Debug, Clone, Copy)]
pub struct CenterCrop {
    size: OutputSize,
}

impl CenterCrop {
    pub fn new(size: impl Into<OutputSize>) -> Result<Self> {
        Ok(Self {
            size: ensure_positive(size.into())?,
        })
    }
}

impl Transform for CenterCrop {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        let (h, w) = sample.dimensions();
        let (new_h, new_w) = self.size.dims();
        let (new_h, new_w) = (new_h as usize, new_w as usize);
        ensure!(
            h >= new_h && w >= new_w,
            "Crop size {}x{} exceeds source {}x{}",
            new_h,
            new_w,
            h,
            w
        );

        let top = (h - new_h) / 2;
        let left = (w - new_w) / 2;

        Ok(Sample {
            image: crop_window(&sample.image, top, left, new_h, new_w),
            label: crop_window(&sample.label, top, left, new_h, new_w),
            edge: crop_window(&sample.edge, top, left, new_h, new_w),
        })
    }
}

// ============================================================================
// RandomCrop
// ============================================================================

/// Crops a window of the target size at a uniformly random offset, drawn
/// independently per call. All three arrays are cropped at the same offset,
/// preserving spatial correspondence.
#[derive(Debug, Clone, Copy)]
pub struct RandomCrop {
    size: OutputSize,
}

impl RandomCrop {
    pub fn new(size: impl Into<OutputSize>) -> Result<Self> {
        Ok(Self {
            size: ensure_positive(size.into())?,
        })
    }
}

impl Transform for RandomCrop {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        let (h, w) = sample.dimensions();
        let (new_h, new_w) = self.size.dims();
        let (new_h, new_w) = (new_h as usize, new_w as usize);
        ensure!(
            h >= new_h && w >= new_w,
            "Crop size {}x{} exceeds source {}x{}",
            new_h,
            new_w,
            h,
            w
        );

        let mut rng = rand::rng();
        let top = if h > new_h {
            rng.random_range(0..h - new_h)
        } else {
            0
        };
        let left = if w > new_w {
            rng.random_range(0..w - new_w)
        } else {
            0
        };

        Ok(Sample {
            image: crop_window(&sample.image, top, left, new_h, new_w),
            label: crop_window(&sample.label, top, left, new_h, new_w),
            edge: crop_window(&sample.edge, top, left, new_h, new_w),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

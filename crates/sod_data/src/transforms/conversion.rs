use crate::sample::Sample;
use crate::transforms::Transform;
use anyhow::{bail, Result};
use ndarray::{s, Array3, ArrayViewMut2, Axis};
use palette::{IntoColor, Lab, Srgb};

/// Channel mean precomputed over the training corpus. Changing it breaks
/// compatibility with released checkpoints.
const RGB_MEAN: f32 = 0.4669;
/// Channel standard deviation paired with [`RGB_MEAN`].
const RGB_STD: f32 = 0.2437;

/// Mask maxima below this threshold skip normalization, so near-empty masks
/// are not amplified into noise.
const MASK_EPSILON: f32 = 1e-6;

// ============================================================================
// Shared helpers
// ============================================================================

fn array_max(array: &Array3<f32>) -> f32 {
    array.iter().fold(0.0_f32, |max, &v| max.max(v))
}

/// Scales a mask so its maximum is exactly 1.0, unless the maximum is below
/// [`MASK_EPSILON`], in which case the mask is left untouched.
fn max_normalize_mask(mask: &mut Array3<f32>) {
    let max = array_max(mask);
    if max >= MASK_EPSILON {
        mask.mapv_inplace(|v| v / max);
    }
}

/// Replicates a single-channel image into 3 channels; 3-channel images pass
/// through unchanged.
fn replicate_gray(image: Array3<f32>) -> Result<Array3<f32>> {
    match image.dim().2 {
        3 => Ok(image),
        1 => {
            let plane = image.index_axis(Axis(2), 0);
            Ok(ndarray::stack(
                Axis(2),
                &[plane.view(), plane.view(), plane.view()],
            )?)
        }
        channels => bail!("Expected a 1- or 3-channel image (got {})", channels),
    }
}

/// Rescales one plane to [0, 1] by its own min/max. A constant plane has no
/// range to map and is set to 0.
fn min_max_plane(mut plane: ArrayViewMut2<f32>) {
    let min = plane.iter().fold(f32::INFINITY, |m, &v| m.min(v));
    let max = plane.iter().fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let range = max - min;
    if range > 0.0 {
        plane.mapv_inplace(|v| (v - min) / range);
    } else {
        plane.fill(0.0);
    }
}

/// Shifts one plane to zero mean and unit standard deviation (population
/// std). A zero-variance plane is only centered.
fn standardize_plane(mut plane: ArrayViewMut2<f32>) {
    let n = plane.len() as f32;
    let mean = plane.sum() / n;
    let var = plane.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std = var.sqrt();
    if std > 0.0 {
        plane.mapv_inplace(|v| (v - mean) / std);
    } else {
        plane.mapv_inplace(|v| v - mean);
    }
}

/// Converts an `(H, W, 3)` RGB array in [0, 255] to CIE Lab (sRGB, D65).
fn rgb_to_lab(rgb: &Array3<f32>) -> Array3<f32> {
    let (h, w, _) = rgb.dim();
    let mut lab = Array3::zeros((h, w, 3));
    for y in 0..h {
        for x in 0..w {
            let srgb = Srgb::new(
                rgb[[y, x, 0]] / 255.0,
                rgb[[y, x, 1]] / 255.0,
                rgb[[y, x, 2]] / 255.0,
            );
            let converted: Lab = srgb.into_color();
            lab[[y, x, 0]] = converted.l;
            lab[[y, x, 1]] = converted.a;
            lab[[y, x, 2]] = converted.b;
        }
    }
    lab
}

/// Transposes `(H, W, C)` to contiguous channel-first `(C, H, W)`.
fn to_chw(array: Array3<f32>) -> Array3<f32> {
    array.permuted_axes([2, 0, 1]).as_standard_layout().to_owned()
}

/// The RGB encoding shared by [`ToTensor`] and [`ColorMode::Rgb`]: divide by
/// the image's own max (skipped for an all-zero image), replicate grayscale
/// to 3 channels, standardize with the fixed corpus statistics.
fn standardize_rgb(image: Array3<f32>) -> Result<Array3<f32>> {
    let max = array_max(&image);
    let image = if max > 0.0 {
        image.mapv(|v| v / max)
    } else {
        image
    };
    let rgb = replicate_gray(image)?;
    Ok(rgb.mapv(|v| (v - RGB_MEAN) / RGB_STD))
}

// ============================================================================
// ToTensor
// ============================================================================

/// Encodes a sample into channel-first tensors with fixed RGB normalization.
///
/// The image becomes `[3, H, W]`: max-normalized to [0, 1], grayscale
/// replicated across all 3 channels, then standardized per channel with the
/// precomputed corpus mean/std. Label and edge become `[1, H, W]`,
/// max-normalized unless nearly empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensor;

impl Transform for ToTensor {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        let Sample {
            image,
            mut label,
            mut edge,
        } = sample;

        max_normalize_mask(&mut label);
        max_normalize_mask(&mut edge);
        let image = standardize_rgb(image)?;

        Ok(Sample {
            image: to_chw(image),
            label: to_chw(label),
            edge: to_chw(edge),
        })
    }
}

// ============================================================================
// ToTensorLab
// ============================================================================

/// Color basis for [`ToTensorLab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Fixed RGB standardization, identical to [`ToTensor`]. Output `[3, H, W]`.
    Rgb,
    /// CIE Lab, min-max normalized then standardized per channel. Output
    /// `[3, H, W]`.
    Lab,
    /// Min-max-normalized RGB concatenated with Lab. Output `[6, H, W]`.
    RgbLab,
}

/// Encoding stage with a selectable color basis.
///
/// Mask handling and the channel-first output layout match [`ToTensor`];
/// only the image encoding differs per [`ColorMode`].
#[derive(Debug, Clone, Copy)]
pub struct ToTensorLab {
    mode: ColorMode,
}

impl ToTensorLab {
    pub fn new(mode: ColorMode) -> Self {
        Self { mode }
    }

    fn encode_lab(image: Array3<f32>) -> Result<Array3<f32>> {
        let rgb = replicate_gray(image)?;
        let mut lab = rgb_to_lab(&rgb);
        for c in 0..3 {
            min_max_plane(lab.slice_mut(s![.., .., c]));
        }
        for c in 0..3 {
            standardize_plane(lab.slice_mut(s![.., .., c]));
        }
        Ok(lab)
    }

    fn encode_rgb_lab(image: Array3<f32>) -> Result<Array3<f32>> {
        let rgb = replicate_gray(image)?;
        let lab = rgb_to_lab(&rgb);

        let (h, w, _) = rgb.dim();
        let mut out = Array3::zeros((h, w, 6));
        out.slice_mut(s![.., .., 0..3]).assign(&rgb);
        out.slice_mut(s![.., .., 3..6]).assign(&lab);
        for c in 0..6 {
            min_max_plane(out.slice_mut(s![.., .., c]));
        }

        // Quirk kept for checkpoint compatibility: channel 0 stays min-max
        // scaled only, while channels 1-5 are additionally standardized.
        for c in 1..6 {
            standardize_plane(out.slice_mut(s![.., .., c]));
        }
        Ok(out)
    }
}

impl Transform for ToTensorLab {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        let Sample {
            image,
            mut label,
            mut edge,
        } = sample;

        max_normalize_mask(&mut label);
        max_normalize_mask(&mut edge);

        let image = match self.mode {
            ColorMode::Rgb => standardize_rgb(image)?,
            ColorMode::Lab => Self::encode_lab(image)?,
            ColorMode::RgbLab => Self::encode_rgb_lab(image)?,
        };

        Ok(Sample {
            image: to_chw(image),
            label: to_chw(label),
            edge: to_chw(edge),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

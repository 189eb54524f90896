//! Image and mask decoding into `(H, W, C)` f32 arrays.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use ndarray::{Array2, Array3};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 8192;

/// Reads and decodes an image file, guessing the format from its content.
fn decode(path: &Path) -> Result<DynamicImage> {
    let file =
        File::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;

    let file_size = file.metadata()?.len() as usize;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut buffer = Vec::with_capacity(file_size);
    reader
        .read_to_end(&mut buffer)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;

    ImageReader::new(Cursor::new(buffer))
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("Failed to decode image: {}", path.display()))
}

/// Loads an image as an `(H, W, C)` f32 array with values in `[0, 255]`.
///
/// Grayscale files decode to a single channel; everything else is converted
/// to RGB first, so `C` is always 1 or 3.
pub fn load_image(path: &Path) -> Result<Array3<f32>> {
    let decoded = decode(path)?;
    let array = match decoded {
        DynamicImage::ImageLuma8(gray) => {
            let (width, height) = gray.dimensions();
            let pixels = gray.into_raw().into_iter().map(f32::from).collect();
            Array3::from_shape_vec((height as usize, width as usize, 1), pixels)?
        }
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = rgb.dimensions();
            let pixels = rgb.into_raw().into_iter().map(f32::from).collect();
            Array3::from_shape_vec((height as usize, width as usize, 3), pixels)?
        }
    };
    Ok(array)
}

/// Loads a label or edge mask as an `(H, W)` f32 array.
///
/// Multi-channel files are reduced to channel 0; masks are discrete
/// annotations, so no color conversion or rescaling is applied.
pub fn load_mask(path: &Path) -> Result<Array2<f32>> {
    let decoded = decode(path)?;
    let array = match decoded {
        DynamicImage::ImageLuma8(gray) => {
            let (width, height) = gray.dimensions();
            let pixels = gray.into_raw().into_iter().map(f32::from).collect();
            Array2::from_shape_vec((height as usize, width as usize), pixels)?
        }
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = rgb.dimensions();
            let pixels = rgb.pixels().map(|p| f32::from(p.0[0])).collect();
            Array2::from_shape_vec((height as usize, width as usize), pixels)?
        }
    };
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use tempfile::NamedTempFile;

    fn save_rgb_fixture() -> Result<NamedTempFile> {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(2, 1, Rgb([10, 20, 30]));
        let file = NamedTempFile::with_suffix(".png")?;
        img.save(file.path())?;
        Ok(file)
    }

    #[test]
    fn test_load_image_rgb() -> Result<()> {
        let file = save_rgb_fixture()?;
        let array = load_image(file.path())?;

        assert_eq!(array.dim(), (2, 3, 3)); // (H, W, C)
        assert_eq!(array[[0, 0, 0]], 255.0);
        assert_eq!(array[[1, 2, 2]], 30.0);
        Ok(())
    }

    #[test]
    fn test_load_image_grayscale_single_channel() -> Result<()> {
        let mut img = GrayImage::new(4, 3);
        img.put_pixel(1, 2, Luma([77]));
        let file = NamedTempFile::with_suffix(".png")?;
        img.save(file.path())?;

        let array = load_image(file.path())?;
        assert_eq!(array.dim(), (3, 4, 1));
        assert_eq!(array[[2, 1, 0]], 77.0);
        Ok(())
    }

    #[test]
    fn test_load_mask_takes_channel_zero() -> Result<()> {
        let file = save_rgb_fixture()?;
        let mask = load_mask(file.path())?;

        assert_eq!(mask.dim(), (2, 3));
        assert_eq!(mask[[0, 0]], 255.0); // red channel only
        assert_eq!(mask[[1, 2]], 10.0);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_image(Path::new("does-not-exist.png")).is_err());
        assert!(load_mask(Path::new("does-not-exist.png")).is_err());
    }
}

use crate::io;
use crate::sample::Sample;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use log::debug;
use ndarray::{Array3, Axis};
use std::path::PathBuf;

/// Random access over preprocessed samples.
///
/// Implementations are `Send + Sync` and every lookup is independent, so an
/// external batching driver may spread `get` calls across worker threads.
pub trait Dataset: Send + Sync {
    /// Total number of samples.
    fn len(&self) -> usize;

    /// Loads and preprocesses the sample at `index`. Out-of-range indices
    /// and decode failures are errors; there is no retry.
    fn get(&self, index: usize) -> Result<Sample>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ground-truth paths parallel to the image list: one label mask and one
/// edge mask per image.
#[derive(Debug, Clone)]
pub struct AnnotationPaths {
    pub labels: Vec<PathBuf>,
    pub edges: Vec<PathBuf>,
}

/// Indexed loader for salient-object image/label/edge triples.
///
/// Each lookup decodes the triple for `index`, canonicalizes it into
/// `(H, W, C)` arrays (masks always single-channel), and runs the configured
/// transform pipeline. Passing `None` for annotations signals that no ground
/// truth is available; zero-filled masks shaped like the image are
/// substituted, which is the usual inference-time configuration.
pub struct SalObjDataset {
    images: Vec<PathBuf>,
    annotations: Option<AnnotationPaths>,
    transform: Option<Box<dyn Transform>>,
}

impl SalObjDataset {
    pub fn new(images: Vec<PathBuf>, annotations: Option<AnnotationPaths>) -> Result<Self> {
        if let Some(paths) = &annotations {
            ensure!(
                paths.labels.len() == images.len(),
                "Label list length {} does not match image list length {}",
                paths.labels.len(),
                images.len()
            );
            ensure!(
                paths.edges.len() == images.len(),
                "Edge list length {} does not match image list length {}",
                paths.edges.len(),
                images.len()
            );
        }

        debug!(
            "SalObjDataset: {} images, ground truth {}",
            images.len(),
            if annotations.is_some() {
                "present"
            } else {
                "absent (zero masks)"
            }
        );

        Ok(Self {
            images,
            annotations,
            transform: None,
        })
    }

    /// Attaches a transform pipeline applied to every loaded sample.
    pub fn with_transform<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }
}

impl Dataset for SalObjDataset {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        ensure!(
            index < self.images.len(),
            "Index {} out of range for dataset of {} samples",
            index,
            self.images.len()
        );

        let image_path = &self.images[index];
        let image = io::load_image(image_path)
            .with_context(|| format!("Failed to load image {}", image_path.display()))?;
        let (h, w, _) = image.dim();

        let (label, edge) = match &self.annotations {
            Some(paths) => {
                let label = io::load_mask(&paths.labels[index])
                    .with_context(|| format!("Failed to load label for index {}", index))?;
                let edge = io::load_mask(&paths.edges[index])
                    .with_context(|| format!("Failed to load edge map for index {}", index))?;
                (label.insert_axis(Axis(2)), edge.insert_axis(Axis(2)))
            }
            None => (Array3::zeros((h, w, 1)), Array3::zeros((h, w, 1))),
        };

        let sample = Sample::new(image, label, edge);
        match &self.transform {
            Some(transform) => transform.apply(sample),
            None => Ok(sample),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{ColorMode, Compose, Resize, ToTensorLab};
    use anyhow::Result;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use tempfile::TempDir;

    /// Writes an RGB image plus gray label/edge masks and returns their paths.
    fn write_triple(
        dir: &TempDir,
        stem: &str,
        (w, h): (u32, u32),
    ) -> Result<(PathBuf, PathBuf, PathBuf)> {
        let image_path = dir.path().join(format!("{stem}.png"));
        let label_path = dir.path().join(format!("{stem}_label.png"));
        let edge_path = dir.path().join(format!("{stem}_edge.png"));

        let mut img = RgbImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.put_pixel(x, y, Rgb([(x * 40) as u8, (y * 40) as u8, 128]));
            }
        }
        img.save(&image_path)?;

        let mut mask = GrayImage::new(w, h);
        mask.put_pixel(w / 2, h / 2, Luma([255]));
        mask.save(&label_path)?;
        mask.save(&edge_path)?;

        Ok((image_path, label_path, edge_path))
    }

    #[test]
    fn test_get_canonicalizes_shapes() -> Result<()> {
        let dir = TempDir::new()?;
        let (image, label, edge) = write_triple(&dir, "a", (6, 4))?;

        let dataset = SalObjDataset::new(
            vec![image],
            Some(AnnotationPaths {
                labels: vec![label],
                edges: vec![edge],
            }),
        )?;

        assert_eq!(dataset.len(), 1);
        let sample = dataset.get(0)?;
        assert_eq!(sample.image.dim(), (4, 6, 3));
        assert_eq!(sample.label.dim(), (4, 6, 1));
        assert_eq!(sample.edge.dim(), (4, 6, 1));
        assert_eq!(sample.label[[2, 3, 0]], 255.0);
        Ok(())
    }

    #[test]
    fn test_absent_annotations_substitute_zero_masks() -> Result<()> {
        let dir = TempDir::new()?;
        let (image, _, _) = write_triple(&dir, "b", (5, 5))?;

        let dataset = SalObjDataset::new(vec![image], None)?;
        let sample = dataset.get(0)?;

        assert_eq!(sample.label.dim(), (5, 5, 1));
        assert!(sample.label.iter().all(|&v| v == 0.0));
        assert!(sample.edge.iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_index_out_of_range() -> Result<()> {
        let dir = TempDir::new()?;
        let (image, _, _) = write_triple(&dir, "c", (3, 3))?;

        let dataset = SalObjDataset::new(vec![image], None)?;
        assert!(dataset.get(1).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_file_propagates_decode_error() -> Result<()> {
        let dataset = SalObjDataset::new(vec![PathBuf::from("nope.png")], None)?;
        assert!(dataset.get(0).is_err());
        Ok(())
    }

    #[test]
    fn test_mismatched_annotation_lengths_rejected() {
        let result = SalObjDataset::new(
            vec![PathBuf::from("a.png"), PathBuf::from("b.png")],
            Some(AnnotationPaths {
                labels: vec![PathBuf::from("a_l.png")],
                edges: vec![PathBuf::from("a_e.png"), PathBuf::from("b_e.png")],
            }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_grayscale_image_gets_channel_axis() -> Result<()> {
        let dir = TempDir::new()?;
        let image_path = dir.path().join("gray.png");
        let mut img = GrayImage::new(5, 4);
        img.put_pixel(1, 2, Luma([200]));
        img.save(&image_path)?;

        let dataset = SalObjDataset::new(vec![image_path], None)?;
        let sample = dataset.get(0)?;
        assert_eq!(sample.image.dim(), (4, 5, 1));
        assert_eq!(sample.label.dim(), (4, 5, 1));

        // The encoding stage replicates the single channel to three.
        let encoded = ToTensorLab::new(ColorMode::Rgb).apply(sample)?;
        assert_eq!(encoded.image.dim(), (3, 4, 5));
        Ok(())
    }

    #[test]
    fn test_transform_chain_is_applied() -> Result<()> {
        let dir = TempDir::new()?;
        let (image, label, edge) = write_triple(&dir, "d", (9, 7))?;

        let pipeline = Compose::new()
            .then(Resize::new(8)?)
            .then(ToTensorLab::new(ColorMode::Rgb));

        let dataset = SalObjDataset::new(
            vec![image],
            Some(AnnotationPaths {
                labels: vec![label],
                edges: vec![edge],
            }),
        )?
        .with_transform(pipeline);

        let sample = dataset.get(0)?;
        assert_eq!(sample.image.dim(), (3, 8, 8));
        assert_eq!(sample.label.dim(), (1, 8, 8));
        Ok(())
    }
}

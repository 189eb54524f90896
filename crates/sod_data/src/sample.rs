use ndarray::Array3;

/// A single data example flowing through the preprocessing pipeline.
///
/// Before the tensor-encoding stage all three arrays are `(H, W, C)` with
/// `image` carrying 1 or 3 channels and `label`/`edge` exactly one. After
/// [`ToTensor`](crate::transforms::ToTensor) or
/// [`ToTensorLab`](crate::transforms::ToTensorLab) they are channel-first
/// `(C, H, W)`.
///
/// Invariant: every transform stage leaves the three arrays agreeing on
/// height and width (channel counts may differ).
#[derive(Debug, Clone)]
pub struct Sample {
    pub image: Array3<f32>,
    pub label: Array3<f32>,
    pub edge: Array3<f32>,
}

impl Sample {
    pub fn new(image: Array3<f32>, label: Array3<f32>, edge: Array3<f32>) -> Self {
        Self { image, label, edge }
    }

    /// Spatial dimensions of the image array, `(height, width)`.
    pub fn dimensions(&self) -> (usize, usize) {
        let (h, w, _) = self.image.dim();
        (h, w)
    }
}

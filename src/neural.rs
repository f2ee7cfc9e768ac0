//! Neural two-frame interpolation via an external ONNX model.
//!
//! The model is a black box `(frame0, frame1, timestep) → frame` in the
//! RIFE family, loaded with ONNX Runtime behind the `neural` cargo feature.
//! Without the feature, [`NeuralInterpolator::load`] returns a loud error
//! and the HTTP layer reports the route as unimplemented.
//!
//! The model expects NCHW float tensors in [0,1] with spatial dimensions
//! divisible by 32; [`padded_dimensions`] computes the common target size
//! for a frame pair.

use std::path::Path;

use image::RgbImage;
#[cfg(feature = "neural")]
use image::imageops::{self, FilterType};

use crate::error::AppError;
#[cfg(feature = "neural")]
use crate::interp::smoothstep;

#[cfg(feature = "neural")]
use ndarray::{Array1, Array4};
#[cfg(feature = "neural")]
use ort::session::Session;

/// Both spatial dimensions fed to the model must be a multiple of this.
pub const SIZE_MULTIPLE: u32 = 32;

/// Common model input size for a frame pair: the smaller of each dimension,
/// rounded up to the next multiple of [`SIZE_MULTIPLE`].
pub fn padded_dimensions(a: (u32, u32), b: (u32, u32)) -> (u32, u32) {
    let round_up = |v: u32| ((v.max(1) - 1) / SIZE_MULTIPLE + 1) * SIZE_MULTIPLE;
    (round_up(a.0.min(b.0)), round_up(a.1.min(b.1)))
}

#[derive(Debug)]
pub struct NeuralInterpolator {
    #[cfg(feature = "neural")]
    session: Session,
}

impl NeuralInterpolator {
    /// Load the interpolation model from an ONNX file.
    #[cfg(feature = "neural")]
    pub fn load(model_path: &Path) -> Result<Self, AppError> {
        let session = Session::builder()
            .map_err(|e| AppError::Neural(format!("failed to create session builder: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| {
                AppError::Neural(format!(
                    "failed to load model '{}': {e}",
                    model_path.display()
                ))
            })?;
        Ok(Self { session })
    }

    #[cfg(not(feature = "neural"))]
    pub fn load(_model_path: &Path) -> Result<Self, AppError> {
        Err(AppError::Neural(
            "built without the `neural` feature; rebuild with `--features neural`".into(),
        ))
    }

    /// Generate `n_between` intermediate frames between `a` and `b`.
    ///
    /// Returns `[a', mid₁ … midₙ, b']` where the endpoints are resized to the
    /// common model size, so every frame in the result has one size.
    /// Timesteps are smooth-stepped: `x = k/(n+1)`, `t = x²(3−2x)`.
    #[cfg(feature = "neural")]
    pub fn interpolate_pair(
        &mut self,
        a: &RgbImage,
        b: &RgbImage,
        n_between: u32,
    ) -> Result<Vec<RgbImage>, AppError> {
        let (w, h) = padded_dimensions(a.dimensions(), b.dimensions());
        let a = resize_to(a, w, h);
        let b = resize_to(b, w, h);

        let tensor_a = to_tensor(&a);
        let tensor_b = to_tensor(&b);

        let mut frames = Vec::with_capacity(n_between as usize + 2);
        frames.push(a);

        for k in 1..=n_between {
            let x = f64::from(k) / f64::from(n_between + 1);
            let t = smoothstep(x) as f32;
            frames.push(self.run_inference(&tensor_a, &tensor_b, t)?);
        }

        frames.push(b);
        Ok(frames)
    }

    #[cfg(not(feature = "neural"))]
    pub fn interpolate_pair(
        &mut self,
        _a: &RgbImage,
        _b: &RgbImage,
        _n_between: u32,
    ) -> Result<Vec<RgbImage>, AppError> {
        Err(AppError::Neural("built without the `neural` feature".into()))
    }

    /// One model invocation at `timestep`.
    #[cfg(feature = "neural")]
    fn run_inference(
        &mut self,
        a: &Array4<f32>,
        b: &Array4<f32>,
        timestep: f32,
    ) -> Result<RgbImage, AppError> {
        let input_a = ort::value::Tensor::from_array(a.clone())
            .map_err(|e| AppError::Neural(format!("failed to create input tensor: {e}")))?;
        let input_b = ort::value::Tensor::from_array(b.clone())
            .map_err(|e| AppError::Neural(format!("failed to create input tensor: {e}")))?;
        let input_t = ort::value::Tensor::from_array(Array1::from_vec(vec![timestep]))
            .map_err(|e| AppError::Neural(format!("failed to create timestep tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![input_a, input_b, input_t])
            .map_err(|e| AppError::Neural(format!("inference failed: {e}")))?;

        let view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| AppError::Neural(format!("failed to extract output tensor: {e}")))?;

        from_tensor(&view)
    }
}

// ── Tensor conversion ─────────────────────────────────────────────────────────

#[cfg(feature = "neural")]
fn resize_to(img: &RgbImage, w: u32, h: u32) -> RgbImage {
    if img.dimensions() == (w, h) {
        img.clone()
    } else {
        imageops::resize(img, w, h, FilterType::Triangle)
    }
}

/// RGB8 → NCHW f32 in [0,1], shape `[1, 3, H, W]`.
#[cfg(feature = "neural")]
fn to_tensor(img: &RgbImage) -> Array4<f32> {
    let (w, h) = img.dimensions();
    let mut arr = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
    for (x, y, px) in img.enumerate_pixels() {
        for ch in 0..3 {
            arr[[0, ch, y as usize, x as usize]] = f32::from(px.0[ch]) / 255.0;
        }
    }
    arr
}

/// NCHW f32 → RGB8, values clamped to [0,1] before scaling.
#[cfg(feature = "neural")]
fn from_tensor(view: &ndarray::ArrayViewD<'_, f32>) -> Result<RgbImage, AppError> {
    let shape = view.shape();
    if shape.len() != 4 || shape[1] != 3 {
        return Err(AppError::Neural(format!(
            "expected [1, 3, H, W] output, got {shape:?}"
        )));
    }
    let (h, w) = (shape[2], shape[3]);
    let mut img = RgbImage::new(w as u32, h as u32);
    for (x, y, px) in img.enumerate_pixels_mut() {
        for ch in 0..3 {
            let v = view[[0, ch, y as usize, x as usize]].clamp(0.0, 1.0);
            px.0[ch] = (v * 255.0).round() as u8;
        }
    }
    Ok(img)
}

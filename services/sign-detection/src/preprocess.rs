//! Image bytes to the normalized NCHW tensor the classifiers expect.

use image::imageops::FilterType;
use thiserror::Error;
use tract_onnx::prelude::tract_ndarray::Array4;

pub const INPUT_SIZE: u32 = 224;
pub const INPUT_SHAPE: (usize, usize, usize, usize) = (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize);

/// ImageNet channel statistics the models were trained with.
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Batch of one RGB image, shape `(1, 3, 224, 224)`.
pub type InputTensor = Array4<f32>;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("image payload is empty")]
    Empty,
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decodes JPEG/PNG/WebP, converts any color mode to RGB, resizes to exactly
/// 224x224 (aspect ratio not kept) and normalizes each channel.
pub fn preprocess(bytes: &[u8]) -> Result<InputTensor, PreprocessError> {
    if bytes.is_empty() { return Err(PreprocessError::Empty); }
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    Ok(Array4::from_shape_fn(INPUT_SHAPE, |(_, c, y, x)| {
        let v = resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
        (v - MEAN[c]) / STD[c]
    }))
}

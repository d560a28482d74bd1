//! Uploaded image decoding and tensor conversion.
//!
//! Any decodable image is accepted: channels are forced to RGB, the frame is
//! resized to the model's square input without preserving aspect ratio, and
//! intensities are scaled to `[0, 1]`.

use image::imageops::FilterType;
use ndarray::Array4;
use thiserror::Error;

use crate::model::INPUT_SHAPE;

/// Raised when uploaded bytes cannot be decoded as an image.
#[derive(Debug, Error)]
#[error("Could not decode uploaded image: {0}")]
pub struct ImageDecodeError(#[from] image::ImageError);

/// Decode raw image bytes into the model input tensor.
///
/// Output shape is `(1, 128, 128, 3)` with every value in `[0, 1]`. The
/// leading singleton axis is the batch dimension the network expects.
pub fn normalize(raw: &[u8]) -> Result<Array4<f32>, ImageDecodeError> {
    let [height, width, _] = INPUT_SHAPE;
    let decoded = image::load_from_memory(raw)?;
    let resized = decoded
        .resize_exact(width as u32, height as u32, FilterType::CatmullRom)
        .to_rgb8();
    let mut tensor = Array4::zeros((1, height, width, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, y as usize, x as usize, channel]] =
                f32::from(pixel.0[channel]) / 255.0;
        }
    }
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn gray_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        let img = image::GrayImage::from_pixel(width, height, image::Luma([value]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode fixture png");
        bytes
    }

    #[test]
    fn grayscale_input_becomes_a_three_channel_square_tensor() {
        let bytes = gray_png(50, 200, 127);
        let tensor = normalize(&bytes).expect("normalize");
        assert_eq!(tensor.dim(), (1, 128, 128, 3));
        for &value in tensor.iter() {
            assert!((0.0..=1.0).contains(&value), "value {value} out of range");
        }
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let img = image::RgbaImage::from_pixel(10, 10, image::Rgba([10, 20, 30, 128]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode fixture png");
        let tensor = normalize(&bytes).expect("normalize");
        assert_eq!(tensor.dim(), (1, 128, 128, 3));
    }

    #[test]
    fn uniform_intensity_scales_by_255() {
        let bytes = gray_png(16, 16, 255);
        let tensor = normalize(&bytes).expect("normalize");
        for &value in tensor.iter() {
            assert!((value - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn garbage_bytes_fail_with_a_decode_error() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(err.to_string().contains("decode"));
    }
}

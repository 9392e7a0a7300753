use image::error::UnsupportedErrorKind;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageError};
use ndarray::{Array, Ix4};
use std::io::Cursor;
use thiserror::Error;

pub const INPUT_WIDTH: u32 = 640;
pub const INPUT_HEIGHT: u32 = 640;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("failed to decode image: {0}")]
    Decode(ImageError),
    #[error("cannot convert image to 3-channel RGB: {0}")]
    UnsupportedMode(ImageError),
}

impl From<ImageError> for EncodeError {
    fn from(err: ImageError) -> Self {
        // Only an unsupported color layout means "cannot produce RGB";
        // everything else (unknown format, truncated stream) is a decode
        // failure of the request body.
        match &err {
            ImageError::Unsupported(unsupported) => match unsupported.kind() {
                UnsupportedErrorKind::Color(_) => EncodeError::UnsupportedMode(err),
                _ => EncodeError::Decode(err),
            },
            _ => EncodeError::Decode(err),
        }
    }
}

pub fn decode_image(image_data: &[u8]) -> Result<DynamicImage, EncodeError> {
    let image_reader = image::ImageReader::new(Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| EncodeError::Decode(ImageError::IoError(e)))?;

    Ok(image_reader.decode()?)
}

/// Turns a decoded image into the model input tensor: a stretch resize to
/// 640x640 (aspect ratio is not preserved), interleaved RGB to planar
/// channel-first, u8 samples scaled into [0.0, 1.0], batch axis of 1.
pub fn encode(image: &DynamicImage) -> Array<f32, Ix4> {
    let resized = image.resize_exact(INPUT_WIDTH, INPUT_HEIGHT, FilterType::CatmullRom);

    let mut input = Array::zeros((1, 3, INPUT_HEIGHT as usize, INPUT_WIDTH as usize));
    for pixel in resized.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn encode_produces_fixed_shape_in_unit_range() {
        let img = ImageBuffer::from_fn(100, 80, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let tensor = encode(&DynamicImage::ImageRgb8(img));

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn solid_red_pixel_fills_red_plane() {
        let img = ImageBuffer::from_pixel(1, 1, Rgb([255u8, 0, 0]));
        let tensor = encode(&DynamicImage::ImageRgb8(img));

        assert!(tensor.slice(ndarray::s![0, 0, .., ..]).iter().all(|&v| v == 1.0));
        assert!(tensor.slice(ndarray::s![0, 1, .., ..]).iter().all(|&v| v == 0.0));
        assert!(tensor.slice(ndarray::s![0, 2, .., ..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn re_encoding_encoder_output_preserves_shape() {
        let img = ImageBuffer::from_fn(50, 30, |x, y| Rgb([x as u8, y as u8, 128]));
        let tensor = encode(&DynamicImage::ImageRgb8(img));

        let mut rgb = RgbImage::new(INPUT_WIDTH, INPUT_HEIGHT);
        for y in 0..INPUT_HEIGHT as usize {
            for x in 0..INPUT_WIDTH as usize {
                rgb.put_pixel(
                    x as u32,
                    y as u32,
                    Rgb([
                        (tensor[[0, 0, y, x]] * 255.) as u8,
                        (tensor[[0, 1, y, x]] * 255.) as u8,
                        (tensor[[0, 2, y, x]] * 255.) as u8,
                    ]),
                );
            }
        }

        let re_encoded = encode(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(tensor.shape(), re_encoded.shape());
    }

    #[test]
    fn decode_accepts_valid_png() {
        let img = ImageBuffer::from_pixel(4, 4, Rgb([10u8, 20, 30]));
        let decoded = decode_image(&png_bytes(&img)).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
    }

    #[test]
    fn decode_rejects_garbage_bytes_as_decode_error() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result, Err(EncodeError::Decode(_))));
    }
}

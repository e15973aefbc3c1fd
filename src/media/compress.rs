//! Lossy re-encoding that trades fidelity for upload size.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use super::MediaError;

const QUALITY_STEPS: &[u8] = &[90, 80, 70, 60, 50, 40];
const SCALE_STEP: f32 = 0.75;
const MIN_DIMENSION: u32 = 320;

#[derive(Debug, Clone, Copy)]
pub struct CompressionOptions {
    pub max_bytes: usize,
    pub max_dimension: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            max_dimension: 1920,
        }
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, MediaError> {
    let mut buf = Vec::new();
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    Ok(buf)
}

/// Decodes `bytes`, bounds the longest side by `max_dimension`, then lowers
/// JPEG quality and finally dimensions until the output fits `max_bytes`.
/// When nothing fits the smallest attempt is returned.
pub fn compress(bytes: &[u8], options: CompressionOptions) -> Result<Vec<u8>, MediaError> {
    let mut img = image::load_from_memory(bytes)?;
    if img.width().max(img.height()) > options.max_dimension {
        img = img.resize(
            options.max_dimension,
            options.max_dimension,
            FilterType::Lanczos3,
        );
    }

    let mut smallest: Option<Vec<u8>> = None;
    loop {
        for &quality in QUALITY_STEPS {
            let encoded = encode_jpeg(&img, quality)?;
            if encoded.len() <= options.max_bytes {
                return Ok(encoded);
            }
            if smallest.as_ref().map_or(true, |s| encoded.len() < s.len()) {
                smallest = Some(encoded);
            }
        }

        let longest = img.width().max(img.height());
        if longest <= MIN_DIMENSION {
            break;
        }
        let target = ((longest as f32) * SCALE_STEP).max(MIN_DIMENSION as f32) as u32;
        img = img.resize(target, target, FilterType::Triangle);
    }

    tracing::debug!(
        max_bytes = options.max_bytes,
        "image could not reach the size target, keeping smallest encoding"
    );
    smallest.ok_or_else(|| MediaError::Task("no encoding produced".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::tests::png_bytes;

    #[test]
    fn test_compress_bounds_dimensions_and_size() {
        let out = compress(&png_bytes(2400, 1200), CompressionOptions::default()).unwrap();
        assert!(out.len() <= 1024 * 1024);

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.width(), 1920);
        assert_eq!(decoded.height(), 960);
    }

    #[test]
    fn test_compress_keeps_small_images_at_size() {
        let out = compress(&png_bytes(200, 100), CompressionOptions::default()).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    #[test]
    fn test_compress_shrinks_until_budget() {
        let options = CompressionOptions {
            max_bytes: 20 * 1024,
            max_dimension: 1920,
        };
        let out = compress(&png_bytes(1600, 1600), options).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert!(decoded.width() < 1600);
    }

    #[test]
    fn test_compress_rejects_garbage() {
        let res = compress(b"definitely not an image", CompressionOptions::default());
        assert!(matches!(res, Err(MediaError::Decode(_))));
    }
}

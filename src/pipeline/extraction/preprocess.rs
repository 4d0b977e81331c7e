//! Page clean-up ahead of OCR.
//!
//! Rasterized statement pages carry shaded table rows, coloured headers and
//! scanner noise. Tesseract reads them best as a clean black-on-white bitmap:
//! grayscale, a global Otsu threshold, then removal of isolated specks.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, RgbImage};
use tracing::debug;

use super::ExtractionError;

const BLACK: u8 = 0;
const WHITE: u8 = 255;

/// Decode a page image, binarize it and re-encode it as PNG.
pub fn preprocess_for_ocr(image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| ExtractionError::ImageProcessing(format!("decode page image: {e}")))?;

    let gray = grayscale(&decoded.to_rgb8());
    let threshold = otsu_threshold(&gray);
    let cleaned = remove_specks(&binarize(&gray, threshold));
    debug!(
        width = cleaned.width(),
        height = cleaned.height(),
        threshold,
        "Page binarized for OCR"
    );
    encode_png(cleaned)
}

/// ITU-R BT.601 luma, the weighting OpenCV and Tesseract assume.
pub fn grayscale(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
        Luma([luma as u8])
    })
}

/// Global threshold maximising between-class variance. A single-valued image
/// yields 0.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[usize::from(pixel.0[0])] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, count)| level as f64 * *count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0.0;
    let mut best_variance = 0.0;
    let mut threshold = 0u8;

    for (level, count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }
        background_sum += level as f64 * *count as f64;

        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_total - background_sum) / foreground_weight as f64;
        let spread = background_mean - foreground_mean;
        let variance = background_weight as f64 * foreground_weight as f64 * spread * spread;
        if variance > best_variance {
            best_variance = variance;
            threshold = level as u8;
        }
    }
    threshold
}

/// Pixels above `threshold` become white, the rest black.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > threshold {
            Luma([WHITE])
        } else {
            Luma([BLACK])
        }
    })
}

/// Flip pixels whose every neighbour (8-connected) has the opposite value.
pub fn remove_specks(binary: &GrayImage) -> GrayImage {
    let (w, h) = binary.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let value = binary.get_pixel(x, y).0[0];
        let mut neighbours = 0;
        let mut opposite = 0;
        for ny in y.saturating_sub(1)..(y + 2).min(h) {
            for nx in x.saturating_sub(1)..(x + 2).min(w) {
                if (nx, ny) == (x, y) {
                    continue;
                }
                neighbours += 1;
                if binary.get_pixel(nx, ny).0[0] != value {
                    opposite += 1;
                }
            }
        }
        if neighbours > 0 && opposite == neighbours {
            Luma([WHITE - value])
        } else {
            Luma([value])
        }
    })
}

fn encode_png(gray: GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

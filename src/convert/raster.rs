//! Resizing and encoding of downsampled images.
//!
//! Output bytes depend only on the pixels and the extension, so converting
//! the same slide twice writes identical files.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbImage};

/// JPEG quality used for `.jpg` outputs.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Bilinear.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Raster formats artifacts can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Format for a file extension, case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            _ => None,
        }
    }

    /// Encode an RGB image.
    pub fn encode(self, image: &RgbImage) -> Result<Vec<u8>, String> {
        let mut output = Vec::new();
        let (width, height) = image.dimensions();

        let result = match self {
            OutputFormat::Png => PngEncoder::new(&mut output).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            ),
            OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut output, DEFAULT_JPEG_QUALITY)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8),
        };

        result.map_err(|e| e.to_string())?;
        Ok(output)
    }
}

/// Resize to exactly `target` with bilinear interpolation.
///
/// Returns the input unchanged (cloned) when it already has that size.
pub fn resize_exact(image: &RgbImage, target: (u32, u32)) -> RgbImage {
    if image.dimensions() == target {
        return image.clone();
    }
    imageops::resize(image, target.0, target.1, RESIZE_FILTER)
}

/// Fit `size` into a square box of edge `box_edge`, preserving aspect ratio.
///
/// Both edges are scaled by `box_edge / max(w, h)` and rounded independently.
/// An edge is never rounded down to zero.
pub fn thumbnail_dimensions(size: (u32, u32), box_edge: u32) -> (u32, u32) {
    let longest = size.0.max(size.1);
    if longest == 0 {
        return (0, 0);
    }
    let fit = |d: u32| {
        let scaled = (box_edge as f64 * d as f64 / longest as f64).round() as u32;
        scaled.max(1)
    };
    (fit(size.0), fit(size.1))
}

// =============================================================================
// Tests
// =============================================================================

//! Slide to downsampled image and thumbnail.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ConvertError;
use crate::naming::{DimensionSuffix, SlideLayout};
use crate::slide::open_slide;

use super::raster::{resize_exact, thumbnail_dimensions, OutputFormat};

// =============================================================================
// ConvertedSlide
// =============================================================================

/// Outcome of one successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedSlide {
    pub id: u32,
    pub image_path: PathBuf,
    pub thumbnail_path: PathBuf,
    pub suffix: DimensionSuffix,

    /// Pyramid level the pixels were read from
    pub level: usize,

    pub thumbnail_size: (u32, u32),
}

/// Encoded outputs, ready to be written.
struct Rendered {
    image: Vec<u8>,
    thumbnail: Vec<u8>,
    thumbnail_size: (u32, u32),
}

// =============================================================================
// Downsampler
// =============================================================================

/// Runs the downsample pipeline for single slides.
///
/// Cloning is cheap; clones share the configuration.
#[derive(Debug, Clone)]
pub struct Downsampler {
    config: Arc<Config>,
}

impl Downsampler {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn with_shared_config(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert one slide at the configured scale factor.
    pub async fn convert(&self, id: u32) -> Result<ConvertedSlide, ConvertError> {
        self.convert_at_scale(id, self.config.scale_factor).await
    }

    /// Convert one slide.
    ///
    /// Reads the best pyramid level in full, resizes it once to
    /// `floor(large / scale)`, then fits a thumbnail from the resized image.
    /// Both outputs overwrite any previous file at the same path.
    pub async fn convert_at_scale(&self, id: u32, scale_factor: u32) -> Result<ConvertedSlide, ConvertError> {
        let layout = SlideLayout::new(&self.config);
        let image_format = output_format(&self.config.image_ext, &self.config.image_dir)?;
        let thumbnail_format = output_format(&self.config.thumbnail_ext, &self.config.thumbnail_dir)?;

        let slide = open_slide(&self.config, id).await?;
        let large = slide.dimensions();

        let suffix = DimensionSuffix::from_large(scale_factor, large)
            .filter(|s| s.small.0 > 0 && s.small.1 > 0)
            .ok_or(ConvertError::EmptyTarget {
                id,
                large,
                scale: scale_factor,
            })?;

        let level = slide.best_pyramid_level(scale_factor);
        debug!(
            slide = id,
            level,
            downsample = ?slide.level_info(level).map(|l| l.downsample),
            "selected pyramid level"
        );

        let region = slide.read_level(level).await?;
        drop(slide);

        let image_path = layout.image_path(id, &suffix);
        let thumbnail_path = layout.thumbnail_path(id, &suffix);

        let small = suffix.small;
        let box_edge = self.config.thumbnail_size;
        let rendered = {
            let image_path = image_path.clone();
            let thumbnail_path = thumbnail_path.clone();
            tokio::task::spawn_blocking(move || {
                render(
                    region,
                    small,
                    box_edge,
                    (image_format, &image_path),
                    (thumbnail_format, &thumbnail_path),
                )
            })
            .await
            .map_err(|e| ConvertError::Decode {
                id,
                message: e.to_string(),
            })??
        };

        write_file(&image_path, &rendered.image).await?;
        info!(slide = id, path = %image_path.display(), "saved image");

        write_file(&thumbnail_path, &rendered.thumbnail).await?;
        info!(slide = id, path = %thumbnail_path.display(), "saved thumbnail");

        Ok(ConvertedSlide {
            id,
            image_path,
            thumbnail_path,
            suffix,
            level,
            thumbnail_size: rendered.thumbnail_size,
        })
    }
}

fn output_format(ext: &str, dir: &Path) -> Result<OutputFormat, ConvertError> {
    OutputFormat::from_extension(ext).ok_or_else(|| ConvertError::Write {
        path: dir.to_path_buf(),
        message: format!("no encoder for extension {:?}", ext),
    })
}

/// Resize, fit the thumbnail and encode both.
fn render(
    region: RgbImage,
    small: (u32, u32),
    box_edge: u32,
    image: (OutputFormat, &Path),
    thumbnail: (OutputFormat, &Path),
) -> Result<Rendered, ConvertError> {
    let resized = resize_exact(&region, small);
    drop(region);

    let thumbnail_size = thumbnail_dimensions(resized.dimensions(), box_edge);
    let thumb = resize_exact(&resized, thumbnail_size);

    let encode_error = |path: &Path| {
        let path = path.to_path_buf();
        move |message| ConvertError::Write { path, message }
    };

    Ok(Rendered {
        image: image.0.encode(&resized).map_err(encode_error(image.1))?,
        thumbnail: thumbnail.0.encode(&thumb).map_err(encode_error(thumbnail.1))?,
        thumbnail_size,
    })
}

/// Write a file, creating its directory first.
async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let write_error = |e: std::io::Error| ConvertError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(path, bytes).await.map_err(write_error)
}

// =============================================================================
// Tests
// =============================================================================

//! Configuration management for the WSI downsampler.
//!
//! [`Config`] is built once at startup and passed by reference to every
//! component. It is never mutated afterwards.
//!
//! The CLI mirrors every setting with an environment variable using the
//! `WSI_` prefix:
//!
//! - `WSI_DATA_DIR` - Base directory for every default path (default: data)
//! - `WSI_SLIDE_DIR` - Source slides (default: `<data>/training_slides`)
//! - `WSI_IMAGE_DIR` - Downsampled images (default: `<data>/training_png`)
//! - `WSI_THUMBNAIL_DIR` - Thumbnails (default: `<data>/training_thumbnail_jpg`)
//! - `WSI_STATS_DIR` - Statistics reports (default: `<data>/svs_stats`)
//! - `WSI_SLIDE_PREFIX` - Slide filename prefix (default: TUPAC-TR)
//! - `WSI_SCALE_FACTOR` - Downsample divisor (default: 32)
//! - `WSI_THUMBNAIL_SIZE` - Thumbnail bounding box edge (default: 300)
//! - `WSI_WORKERS` - Worker count (default: available parallelism)

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::convert::OutputFormat;

// =============================================================================
// Default Values
// =============================================================================

/// Default base directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default slide filename prefix.
pub const DEFAULT_SLIDE_PREFIX: &str = "TUPAC-TR";

/// Default source slide extension.
pub const DEFAULT_SLIDE_EXT: &str = "svs";

/// Default downsampled image extension.
pub const DEFAULT_IMAGE_EXT: &str = "png";

/// Default thumbnail extension.
pub const DEFAULT_THUMBNAIL_EXT: &str = "jpg";

/// Default downsample divisor.
pub const DEFAULT_SCALE_FACTOR: u32 = 32;

/// Default thumbnail bounding box edge in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 300;

const SLIDE_SUBDIR: &str = "training_slides";
const IMAGE_SUBDIR: &str = "training_png";
const THUMBNAIL_SUBDIR: &str = "training_thumbnail_jpg";
const STATS_SUBDIR: &str = "svs_stats";
const FILTER_SUBDIR: &str = "filter_png";
const FILTER_THUMBNAIL_SUBDIR: &str = "filter_thumbnail_jpg";
const TILE_SUMMARY_SUBDIR: &str = "tile_summary_png";
const TILE_SUMMARY_THUMBNAIL_SUBDIR: &str = "tile_summary_thumbnail_jpg";

/// Worker count used when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// =============================================================================
// Config
// =============================================================================

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub slide_dir: PathBuf,
    pub slide_prefix: String,
    pub slide_ext: String,

    pub image_dir: PathBuf,
    pub image_ext: String,

    pub thumbnail_dir: PathBuf,
    pub thumbnail_ext: String,

    pub stats_dir: PathBuf,
    pub filter_dir: PathBuf,
    pub filter_thumbnail_dir: PathBuf,
    pub tile_summary_dir: PathBuf,
    pub tile_summary_thumbnail_dir: PathBuf,

    /// Integer divisor applied to native dimensions
    pub scale_factor: u32,

    /// Edge of the box thumbnails are fitted into
    pub thumbnail_size: u32,

    pub workers: usize,
}

impl Config {
    /// Defaults with every directory placed under `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let base = data_dir.as_ref();
        Self {
            slide_dir: base.join(SLIDE_SUBDIR),
            slide_prefix: DEFAULT_SLIDE_PREFIX.to_string(),
            slide_ext: DEFAULT_SLIDE_EXT.to_string(),
            image_dir: base.join(IMAGE_SUBDIR),
            image_ext: DEFAULT_IMAGE_EXT.to_string(),
            thumbnail_dir: base.join(THUMBNAIL_SUBDIR),
            thumbnail_ext: DEFAULT_THUMBNAIL_EXT.to_string(),
            stats_dir: base.join(STATS_SUBDIR),
            filter_dir: base.join(FILTER_SUBDIR),
            filter_thumbnail_dir: base.join(FILTER_THUMBNAIL_SUBDIR),
            tile_summary_dir: base.join(TILE_SUMMARY_SUBDIR),
            tile_summary_thumbnail_dir: base.join(TILE_SUMMARY_THUMBNAIL_SUBDIR),
            scale_factor: DEFAULT_SCALE_FACTOR,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            workers: default_workers(),
        }
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.scale_factor == 0 {
            return Err("scale_factor must be greater than 0".to_string());
        }
        if self.thumbnail_size == 0 {
            return Err("thumbnail_size must be greater than 0".to_string());
        }
        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }
        if self.slide_prefix.is_empty() {
            return Err("slide_prefix must not be empty".to_string());
        }

        for (name, ext) in [
            ("slide_ext", &self.slide_ext),
            ("image_ext", &self.image_ext),
            ("thumbnail_ext", &self.thumbnail_ext),
        ] {
            if ext.is_empty() {
                return Err(format!("{} must not be empty", name));
            }
            if ext.starts_with('.') {
                return Err(format!("{} must be given without a leading dot", name));
            }
        }

        for (name, ext) in [("image_ext", &self.image_ext), ("thumbnail_ext", &self.thumbnail_ext)] {
            if OutputFormat::from_extension(ext).is_none() {
                return Err(format!("{} must be png or jpg, got {}", name, ext));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_DATA_DIR)
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Downsampler - Batch conversion of Whole Slide Images.
///
/// Converts pyramidal slides into downsampled images and thumbnails whose
/// names record the original and scaled dimensions.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-downsampler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Downsample every slide in the source directory.
    Convert(ConvertArgs),

    /// Report dimension statistics over all slides.
    Stats(StatsArgs),

    /// Print pyramid information and group slides by magnification.
    Info(InfoArgs),

    /// Decode an artifact name and map a small-image pixel to full resolution.
    Locate(LocateArgs),
}

/// Paths and naming shared by every command.
#[derive(Args, Debug, Clone)]
pub struct PathArgs {
    /// Base directory for every path not set explicitly.
    #[arg(long, default_value = DEFAULT_DATA_DIR, env = "WSI_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Directory holding the source slides.
    #[arg(long, env = "WSI_SLIDE_DIR")]
    pub slide_dir: Option<PathBuf>,

    /// Directory for downsampled images.
    #[arg(long, env = "WSI_IMAGE_DIR")]
    pub image_dir: Option<PathBuf>,

    /// Directory for thumbnails.
    #[arg(long, env = "WSI_THUMBNAIL_DIR")]
    pub thumbnail_dir: Option<PathBuf>,

    /// Directory for statistics reports.
    #[arg(long, env = "WSI_STATS_DIR")]
    pub stats_dir: Option<PathBuf>,

    /// Slide filename prefix.
    #[arg(long, default_value = DEFAULT_SLIDE_PREFIX, env = "WSI_SLIDE_PREFIX")]
    pub slide_prefix: String,

    /// Source slide extension.
    #[arg(long, default_value = DEFAULT_SLIDE_EXT, env = "WSI_SLIDE_EXT")]
    pub slide_ext: String,

    /// Downsampled image extension (png or jpg).
    #[arg(long, default_value = DEFAULT_IMAGE_EXT, env = "WSI_IMAGE_EXT")]
    pub image_ext: String,

    /// Thumbnail extension (jpg or png).
    #[arg(long, default_value = DEFAULT_THUMBNAIL_EXT, env = "WSI_THUMBNAIL_EXT")]
    pub thumbnail_ext: String,

    /// Integer downsample divisor.
    #[arg(long, default_value_t = DEFAULT_SCALE_FACTOR, env = "WSI_SCALE_FACTOR")]
    pub scale_factor: u32,

    /// Thumbnail bounding box edge in pixels.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_SIZE, env = "WSI_THUMBNAIL_SIZE")]
    pub thumbnail_size: u32,

    /// Number of workers (defaults to available parallelism).
    #[arg(long, env = "WSI_WORKERS")]
    pub workers: Option<usize>,
}

impl PathArgs {
    /// Build the process configuration from parsed arguments.
    pub fn to_config(&self) -> Config {
        let mut config = Config::with_data_dir(&self.data_dir);

        if let Some(ref dir) = self.slide_dir {
            config.slide_dir = dir.clone();
        }
        if let Some(ref dir) = self.image_dir {
            config.image_dir = dir.clone();
        }
        if let Some(ref dir) = self.thumbnail_dir {
            config.thumbnail_dir = dir.clone();
        }
        if let Some(ref dir) = self.stats_dir {
            config.stats_dir = dir.clone();
        }

        config.slide_prefix = self.slide_prefix.clone();
        config.slide_ext = self.slide_ext.clone();
        config.image_ext = self.image_ext.clone();
        config.thumbnail_ext = self.thumbnail_ext.clone();
        config.scale_factor = self.scale_factor;
        config.thumbnail_size = self.thumbnail_size;
        if let Some(workers) = self.workers {
            config.workers = workers;
        }

        config
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Run the whole range on a single worker.
    #[arg(long, default_value_t = false)]
    pub single: bool,

    /// Convert only this slide id.
    #[arg(long, conflicts_with = "single")]
    pub slide: Option<u32>,

    /// Print the batch report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Also print every slide property.
    #[arg(long, default_value_t = false)]
    pub properties: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    /// Artifact filename or path carrying a dimension suffix.
    pub name: String,

    /// X coordinate in the downsampled image.
    pub x: u32,

    /// Y coordinate in the downsampled image.
    pub y: u32,
}

// =============================================================================
// Tests
// =============================================================================

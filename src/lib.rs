//! # WSI Downsampler
//!
//! Batch conversion of Whole Slide Images into downsampled images and
//! thumbnails.
//!
//! Every output name records the scale factor and both the original and the
//! downsampled dimensions, e.g.
//! `TUPAC-TR-005-32x-49920x108288-1560x3384.png`, so later stages can recover
//! slide geometry from the filename alone.
//!
//! ## Features
//!
//! - **Native slide parsing**: TIFF and BigTIFF pyramids, Aperio SVS tiles
//!   with shared JPEG tables, no external slide library
//! - **One resize per slide**: the coarsest pyramid level that still has
//!   enough pixels is read and resized straight to the target
//! - **Parallel batches**: the slide range is split evenly across workers, and
//!   a failing slide never stops the others
//!
//! ## Architecture
//!
//! - [`io`] - Positioned reads from slide files
//! - [`mod@format`] - TIFF/SVS parsing and JPEG tile preparation
//! - [`slide`] - Opening slides by id and reading pyramid levels
//! - [`naming`] - Dimension suffix codec and artifact paths
//! - [`convert`] - Downsample pipeline and coordinate mapping
//! - [`batch`] - Work partitioning and dispatch
//! - [`stats`] - Slide statistics and pyramid information
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_downsampler::{Config, Dispatcher, Downsampler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::with_data_dir("data");
//!     let workers = config.workers;
//!
//!     let dispatcher = Dispatcher::new(Downsampler::new(config));
//!     let report = dispatcher.run(5, workers).await.unwrap();
//!     println!("{} of {} slides converted", report.converted, report.requested);
//! }
//! ```

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod io;
pub mod naming;
pub mod slide;
pub mod stats;

// Re-export commonly used types
pub use batch::{partition, BatchReport, Dispatcher, IdRange, RangeOutcome, SlideFailure};
pub use config::{Cli, Command, Config};
pub use convert::{map_small_to_large, thumbnail_dimensions, ConvertedSlide, Downsampler, OutputFormat};
pub use error::{ConvertError, IoError, NameError, PartitionError, SlideOpenError, TiffError};
pub use format::tiff::{ByteOrder, Compression, PyramidLevel, TiffHeader, TiffPyramid, TileData};
pub use format::{SlideFormat, SvsMetadata};
pub use io::{LocalFileReader, RangeReader};
pub use naming::{decode, encode, scaled_dimensions, DimensionSuffix, SlideLayout};
pub use slide::{open_slide, resolve_path, LevelInfo, Slide};
pub use stats::{MagnificationGroups, SlideInfo, SlideStats};

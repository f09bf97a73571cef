//! The downsample pipeline and the inverse coordinate mapping.
//!
//! - [`service`] turns one slide into a downsampled image and a thumbnail
//! - [`raster`] resizes and encodes RGB images
//! - [`mapping`] maps downsampled pixels back to full resolution

pub mod mapping;
pub mod raster;
pub mod service;

pub use mapping::map_small_to_large;
pub use raster::{resize_exact, thumbnail_dimensions, OutputFormat, DEFAULT_JPEG_QUALITY};
pub use service::{ConvertedSlide, Downsampler};

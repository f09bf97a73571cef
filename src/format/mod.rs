//! Parsers for whole-slide image files.
//!
//! Slides are TIFF-based: Aperio SVS (identified by "Aperio" in the first
//! ImageDescription) or generic tiled pyramidal TIFF. Both share the same
//! pyramid layout; SVS adds abbreviated JPEG tiles and a property list.

pub mod jpeg;
pub mod svs;
pub mod tiff;

pub use jpeg::{prepare_tile_jpeg, scan_header, StreamHeader};
pub use svs::{SlideFormat, SvsMetadata};

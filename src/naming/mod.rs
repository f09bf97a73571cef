//! Artifact naming.
//!
//! - [`codec`] embeds and recovers the dimension suffix
//! - [`layout`] builds slide and artifact paths and finds artifacts by id

pub mod codec;
pub mod layout;

pub use codec::{decode, encode, scaled_dimensions, DimensionSuffix};
pub use layout::{SlideLayout, FILTERED_MARKER, STATS_REPORT_NAME, TILE_SUMMARY_MARKER};

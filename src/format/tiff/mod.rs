//! TIFF and BigTIFF structure parsing for pyramidal slides.
//!
//! - **Byte order**: declared by the header (II or MM) and applied to every
//!   multi-byte value.
//! - **Classic TIFF vs BigTIFF**: 32-bit vs 64-bit offsets, handled transparently.
//! - **IFDs**: one per stored image. A slide has one per pyramid level plus
//!   associated images such as the label and macro.

mod parser;
mod pyramid;
mod tags;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pyramid::{AssociatedImage, PyramidLevel, TiffPyramid, TileData, MAX_AXIS_SKEW};
pub use tags::{Compression, FieldType, TiffTag};
pub use values::ValueReader;

//! Pyramid level identification.
//!
//! A slide file holds more IFDs than pyramid levels: Aperio files add a
//! thumbnail, a label and a macro image. Those associated images are stored
//! as strips, so the pyramid is taken to be the tiled IFDs that carry tile
//! data, ordered by area. A tiled IFD whose per-axis downsample disagrees with
//! the base level by more than [`MAX_AXIS_SKEW`] is treated as associated too.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::TiffTag;
use super::values::ValueReader;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of IFDs followed in one file
const MAX_IFDS: usize = 100;

/// Maximum number of entries accepted in one IFD
const MAX_IFD_ENTRIES: u64 = 4096;

/// Allowed relative difference between the X and Y downsample of a level
pub const MAX_AXIS_SKEW: f64 = 0.1;

// =============================================================================
// PyramidLevel
// =============================================================================

/// One resolution tier of the slide. Level 0 is full resolution.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Index of this level in the pyramid (0 = highest resolution)
    pub level_index: usize,

    /// Index of the IFD in the file's IFD chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,

    /// Downsample factor relative to level 0 (1.0 for level 0)
    pub downsample: f64,

    /// Raw Compression tag value (1 when absent)
    pub compression: u16,

    pub samples_per_pixel: u16,

    /// Raw PhotometricInterpretation tag value, if present
    pub photometric: Option<u16>,

    pub tile_offsets_entry: Option<IfdEntry>,
    pub tile_byte_counts_entry: Option<IfdEntry>,
    pub jpeg_tables_entry: Option<IfdEntry>,
}

impl PyramidLevel {
    /// Build a level from an IFD, or `None` if it is not tiled.
    fn from_ifd(ifd: &Ifd, ifd_index: usize, byte_order: ByteOrder) -> Option<Self> {
        let tile_width = ifd.tile_width(byte_order)?;
        let tile_height = ifd.tile_height(byte_order)?;
        let width = ifd.image_width(byte_order)?;
        let height = ifd.image_height(byte_order)?;

        if tile_width == 0 || tile_height == 0 || width == 0 || height == 0 {
            return None;
        }

        // The tile grid must be indexable as u32
        let tiles_x = width.div_ceil(tile_width);
        let tiles_y = height.div_ceil(tile_height);
        tiles_x.checked_mul(tiles_y)?;

        Some(PyramidLevel {
            level_index: 0,
            ifd_index,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x,
            tiles_y,
            downsample: 1.0,
            compression: ifd.compression(byte_order).unwrap_or(1),
            samples_per_pixel: ifd.samples_per_pixel(byte_order),
            photometric: ifd.photometric(byte_order),
            tile_offsets_entry: ifd.get_entry_by_tag(TiffTag::TileOffsets).cloned(),
            tile_byte_counts_entry: ifd.get_entry_by_tag(TiffTag::TileByteCounts).cloned(),
            jpeg_tables_entry: ifd.get_entry_by_tag(TiffTag::JpegTables).cloned(),
        })
    }

    pub fn has_tile_data(&self) -> bool {
        self.tile_offsets_entry.is_some() && self.tile_byte_counts_entry.is_some()
    }

    pub fn tile_count(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    /// Row-major tile index, or `None` when out of bounds.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<u32> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        Some(tile_y * self.tiles_x + tile_x)
    }

    /// Visible pixel size of a tile. Right and bottom edge tiles are clipped
    /// to the image bounds even though their stored data is full-size.
    pub fn tile_dimensions(&self, tile_x: u32, tile_y: u32) -> Option<(u32, u32)> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        let w = (self.width - tile_x * self.tile_width).min(self.tile_width);
        let h = (self.height - tile_y * self.tile_height).min(self.tile_height);
        Some((w, h))
    }
}

// =============================================================================
// AssociatedImage
// =============================================================================

/// An IFD that is not part of the pyramid (label, macro, thumbnail).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociatedImage {
    pub ifd_index: usize,
    pub width: u32,
    pub height: u32,
}

// =============================================================================
// TiffPyramid
// =============================================================================

/// The pyramid levels of a TIFF file, level 0 first.
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    pub header: TiffHeader,
    pub levels: Vec<PyramidLevel>,
    pub associated: Vec<AssociatedImage>,

    /// ImageDescription of the first IFD, where vendors put slide properties
    pub description_entry: Option<IfdEntry>,
}

impl TiffPyramid {
    /// Parse the header and IFD chain and identify the pyramid.
    pub async fn parse<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_len = BIGTIFF_HEADER_SIZE.min(reader.size() as usize);
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header).await?;
        let pyramid = Self::build(header, &ifds);

        if pyramid.levels.is_empty() {
            return Err(TiffError::NoPyramidLevels);
        }

        debug!(
            slide = reader.identifier(),
            ifds = ifds.len(),
            levels = pyramid.levels.len(),
            "parsed TIFF structure"
        );

        Ok(pyramid)
    }

    async fn parse_all_ifds<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if !seen.insert(offset) {
                // Cyclic next-IFD chain
                break;
            }

            let count_bytes = reader
                .read_exact_at(offset, header.ifd_count_size())
                .await?;
            let entry_count = if header.is_bigtiff {
                header.byte_order.read_u64(&count_bytes)
            } else {
                header.byte_order.read_u16(&count_bytes) as u64
            };

            if entry_count > MAX_IFD_ENTRIES {
                return Err(TiffError::InvalidTagValue {
                    tag: "IFD",
                    message: format!("{} entries at offset {}", entry_count, offset),
                });
            }

            let ifd_size = Ifd::calculate_size(entry_count, header);
            let ifd_bytes = reader.read_exact_at(offset, ifd_size).await?;
            let ifd = Ifd::parse(&ifd_bytes, header)?;

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }

    /// Split parsed IFDs into pyramid levels and associated images.
    pub fn build(header: TiffHeader, ifds: &[Ifd]) -> Self {
        let byte_order = header.byte_order;
        let mut candidates = Vec::new();
        let mut associated = Vec::new();

        for (ifd_index, ifd) in ifds.iter().enumerate() {
            match PyramidLevel::from_ifd(ifd, ifd_index, byte_order) {
                Some(level) if level.has_tile_data() => candidates.push(level),
                _ => {
                    if let (Some(width), Some(height)) =
                        (ifd.image_width(byte_order), ifd.image_height(byte_order))
                    {
                        associated.push(AssociatedImage {
                            ifd_index,
                            width,
                            height,
                        });
                    }
                }
            }
        }

        candidates.sort_by(|a, b| {
            let area_a = a.width as u64 * a.height as u64;
            let area_b = b.width as u64 * b.height as u64;
            area_b.cmp(&area_a)
        });

        let (levels, skewed) = Self::select_levels(candidates);
        associated.extend(skewed.into_iter().map(|level| AssociatedImage {
            ifd_index: level.ifd_index,
            width: level.width,
            height: level.height,
        }));
        associated.sort_by_key(|image| image.ifd_index);

        let description_entry = ifds
            .first()
            .and_then(|ifd| ifd.get_entry_by_tag(TiffTag::ImageDescription))
            .cloned();

        TiffPyramid {
            header,
            levels,
            associated,
            description_entry,
        }
    }

    /// Assign downsamples against the largest candidate and drop candidates
    /// whose two axes disagree. Expects candidates sorted by area, largest first.
    fn select_levels(candidates: Vec<PyramidLevel>) -> (Vec<PyramidLevel>, Vec<PyramidLevel>) {
        let Some(base) = candidates.first() else {
            return (Vec::new(), Vec::new());
        };
        let base_width = base.width as f64;
        let base_height = base.height as f64;

        let mut levels = Vec::new();
        let mut rejected = Vec::new();

        for mut level in candidates {
            let downsample_x = base_width / level.width as f64;
            let downsample_y = base_height / level.height as f64;
            let skew = (downsample_x - downsample_y).abs() / downsample_x.max(downsample_y);

            if skew > MAX_AXIS_SKEW {
                rejected.push(level);
                continue;
            }

            level.level_index = levels.len();
            level.downsample = (downsample_x + downsample_y) / 2.0;
            levels.push(level);
        }

        (levels, rejected)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn get_level(&self, level: usize) -> Option<&PyramidLevel> {
        self.levels.get(level)
    }

    /// Dimensions of level 0.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.levels.first().map(|l| (l.width, l.height))
    }

    /// Index of the coarsest level whose downsample does not exceed `downsample`.
    ///
    /// Levels are scanned in order of increasing downsample; a request below
    /// level 0's downsample gets level 0.
    pub fn best_level_for_downsample(&self, downsample: f64) -> usize {
        let mut best = 0;
        for (index, level) in self.levels.iter().enumerate() {
            if level.downsample > downsample {
                break;
            }
            best = index;
        }
        best
    }
}

// =============================================================================
// Tile Data Loading
// =============================================================================

/// Tile locations and shared JPEG tables of one level.
#[derive(Debug, Clone)]
pub struct TileData {
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
    pub jpeg_tables: Option<Bytes>,
}

impl TileData {
    /// Read the TileOffsets, TileByteCounts and JPEGTables of a level.
    pub async fn load<R: RangeReader>(
        reader: &R,
        level: &PyramidLevel,
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        let value_reader = ValueReader::new(reader, header);

        let offsets_entry = level
            .tile_offsets_entry
            .as_ref()
            .ok_or(TiffError::MissingTag("TileOffsets"))?;
        let counts_entry = level
            .tile_byte_counts_entry
            .as_ref()
            .ok_or(TiffError::MissingTag("TileByteCounts"))?;

        let offsets = value_reader.read_u64_array(offsets_entry).await?;
        let byte_counts = value_reader.read_u64_array(counts_entry).await?;

        let expected = level.tile_count() as usize;
        if offsets.len() < expected || byte_counts.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: "TileOffsets",
                message: format!(
                    "level {} needs {} tiles, found {} offsets and {} byte counts",
                    level.level_index,
                    expected,
                    offsets.len(),
                    byte_counts.len()
                ),
            });
        }

        let jpeg_tables = match level.jpeg_tables_entry {
            Some(ref entry) => Some(value_reader.read_bytes(entry).await?),
            None => None,
        };

        Ok(TileData {
            offsets,
            byte_counts,
            jpeg_tables,
        })
    }

    /// Offset and byte count of a tile.
    pub fn get_tile_location(&self, tile_index: u32) -> Option<(u64, u64)> {
        let idx = tile_index as usize;
        Some((*self.offsets.get(idx)?, *self.byte_counts.get(idx)?))
    }
}

// =============================================================================
// Tests
// =============================================================================

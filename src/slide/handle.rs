//! An opened slide.
//!
//! A [`Slide`] owns its reader for the duration of one conversion. Opening
//! parses the IFD chain and loads every level's tile index up front, so a
//! slide that opens successfully can be read level by level without further
//! structural surprises.

use bytes::Bytes;
use image::{imageops, DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use serde::Serialize;
use tracing::debug;

use crate::error::{ConvertError, TiffError};
use crate::format::tiff::{Compression, PyramidLevel, TiffPyramid, TileData, ValueReader};
use crate::format::{prepare_tile_jpeg, SlideFormat, SvsMetadata};
use crate::io::RangeReader;

/// PhotometricInterpretation value for RGB samples.
const PHOTOMETRIC_RGB: u16 = 2;

// =============================================================================
// Level Information
// =============================================================================

/// Snapshot of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelInfo {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,

    /// Downsample factor relative to level 0
    pub downsample: f64,
}

// =============================================================================
// Slide
// =============================================================================

/// An opened slide and its parsed structure.
#[derive(Debug)]
pub struct Slide<R: RangeReader> {
    id: u32,
    reader: R,
    pyramid: TiffPyramid,
    tile_data: Vec<TileData>,
    format: SlideFormat,
    metadata: SvsMetadata,
}

impl<R: RangeReader> Slide<R> {
    /// Parse a slide from any range reader.
    ///
    /// Fails if the file is not a TIFF, has no tiled levels, or stores a level
    /// with a compression that cannot be decoded.
    pub async fn from_reader(id: u32, reader: R) -> Result<Self, TiffError> {
        let pyramid = TiffPyramid::parse(&reader).await?;

        let mut tile_data = Vec::with_capacity(pyramid.levels.len());
        for level in &pyramid.levels {
            check_decodable(level)?;
            tile_data.push(TileData::load(&reader, level, &pyramid.header).await?);
        }

        let description = match pyramid.description_entry {
            Some(ref entry) => ValueReader::new(&reader, &pyramid.header)
                .read_string(entry)
                .await
                .ok(),
            None => None,
        };
        let format = SlideFormat::from_description(description.as_deref());
        let metadata = description
            .as_deref()
            .map(SvsMetadata::parse)
            .unwrap_or_default();

        debug!(
            slide = id,
            format = format.name(),
            levels = pyramid.levels.len(),
            "opened slide"
        );

        Ok(Self {
            id,
            reader,
            pyramid,
            tile_data,
            format,
            metadata,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn format(&self) -> SlideFormat {
        self.format
    }

    pub fn metadata(&self) -> &SvsMetadata {
        &self.metadata
    }

    /// Native full-resolution dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        // Parsing guarantees at least one level
        self.pyramid.dimensions().unwrap_or((0, 0))
    }

    pub fn level_count(&self) -> usize {
        self.pyramid.level_count()
    }

    pub fn level_info(&self, level: usize) -> Option<LevelInfo> {
        self.pyramid.get_level(level).map(|l| LevelInfo {
            width: l.width,
            height: l.height,
            tile_width: l.tile_width,
            tile_height: l.tile_height,
            downsample: l.downsample,
        })
    }

    pub fn level_dimensions(&self) -> Vec<(u32, u32)> {
        self.pyramid
            .levels
            .iter()
            .map(|l| (l.width, l.height))
            .collect()
    }

    pub fn level_downsamples(&self) -> Vec<f64> {
        self.pyramid.levels.iter().map(|l| l.downsample).collect()
    }

    /// Number of IFDs outside the pyramid (label, macro, thumbnail).
    pub fn associated_image_count(&self) -> usize {
        self.pyramid.associated.len()
    }

    /// Coarsest level whose downsample does not exceed `scale_factor`.
    pub fn best_pyramid_level(&self, scale_factor: u32) -> usize {
        self.pyramid.best_level_for_downsample(scale_factor as f64)
    }

    /// Read one level in full as an RGB image at the level's own resolution.
    ///
    /// Tile bytes are fetched first; decoding and stitching then run on the
    /// blocking pool.
    pub async fn read_level(&self, level: usize) -> Result<RgbImage, ConvertError> {
        let id = self.id;
        let read_error = |source| ConvertError::Read { id, source };

        let info = self
            .pyramid
            .get_level(level)
            .ok_or_else(|| {
                read_error(TiffError::InvalidTagValue {
                    tag: "level",
                    message: format!("level {} of {}", level, self.level_count()),
                })
            })?
            .clone();
        let tile_data = &self.tile_data[level];

        let mut tiles = Vec::with_capacity(info.tile_count() as usize);
        for tile_y in 0..info.tiles_y {
            for tile_x in 0..info.tiles_x {
                let index = tile_y * info.tiles_x + tile_x;
                let (offset, length) = tile_data
                    .get_tile_location(index)
                    .ok_or(TiffError::MissingTag("TileOffsets"))
                    .map_err(read_error)?;
                let bytes = self
                    .reader
                    .read_exact_at(offset, length as usize)
                    .await
                    .map_err(|e| read_error(e.into()))?;
                tiles.push((tile_x, tile_y, bytes));
            }
        }

        debug!(
            slide = id,
            level,
            width = info.width,
            height = info.height,
            tiles = tiles.len(),
            "read level tiles"
        );

        let tables = tile_data.jpeg_tables.clone();
        tokio::task::spawn_blocking(move || stitch_level(&info, tables.as_deref(), tiles))
            .await
            .map_err(|e| ConvertError::Decode {
                id,
                message: e.to_string(),
            })?
            .map_err(|message| ConvertError::Decode { id, message })
    }
}

fn check_decodable(level: &PyramidLevel) -> Result<(), TiffError> {
    let supported = Compression::from_u16(level.compression)
        .map(Compression::is_supported)
        .unwrap_or(false);
    if !supported {
        let name = Compression::from_u16(level.compression)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| level.compression.to_string());
        return Err(TiffError::UnsupportedCompression(name));
    }

    if level.compression == Compression::None as u16
        && !matches!(level.samples_per_pixel, 1 | 3 | 4)
    {
        return Err(TiffError::InvalidTagValue {
            tag: "SamplesPerPixel",
            message: format!("{} samples in an uncompressed level", level.samples_per_pixel),
        });
    }

    Ok(())
}

// =============================================================================
// Tile Decoding
// =============================================================================

/// Decode every tile of a level and place it on one RGB canvas.
///
/// Edge tiles are stored full-size; pasting clips them to the level bounds.
fn stitch_level(
    level: &PyramidLevel,
    tables: Option<&[u8]>,
    tiles: Vec<(u32, u32, Bytes)>,
) -> Result<RgbImage, String> {
    let mut canvas = RgbImage::new(level.width, level.height);

    for (tile_x, tile_y, bytes) in tiles {
        let tile = decode_tile(level, tables, &bytes)
            .map_err(|e| format!("tile ({}, {}): {}", tile_x, tile_y, e))?;
        imageops::replace(
            &mut canvas,
            &tile,
            tile_x as i64 * level.tile_width as i64,
            tile_y as i64 * level.tile_height as i64,
        );
    }

    Ok(canvas)
}

fn decode_tile(level: &PyramidLevel, tables: Option<&[u8]>, bytes: &[u8]) -> Result<RgbImage, String> {
    if level.compression == Compression::Jpeg as u16 {
        let rgb = level.photometric == Some(PHOTOMETRIC_RGB);
        let stream = prepare_tile_jpeg(tables, bytes, rgb);
        let decoded = image::load_from_memory_with_format(&stream, ImageFormat::Jpeg)
            .map_err(|e| e.to_string())?;
        return Ok(decoded.to_rgb8());
    }

    decode_raw_tile(level, bytes)
}

/// Uncompressed 8-bit interleaved samples.
fn decode_raw_tile(level: &PyramidLevel, bytes: &[u8]) -> Result<RgbImage, String> {
    let (w, h) = (level.tile_width, level.tile_height);
    let samples = level.samples_per_pixel as usize;
    let expected = w as usize * h as usize * samples;
    if bytes.len() < expected {
        return Err(format!(
            "expected {} bytes of raw samples, got {}",
            expected,
            bytes.len()
        ));
    }
    let data = bytes[..expected].to_vec();

    let image = match samples {
        1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        _ => None,
    };

    image
        .map(|i| i.to_rgb8())
        .ok_or_else(|| format!("cannot interpret {} samples per pixel", samples))
}

// =============================================================================
// Tests
// =============================================================================

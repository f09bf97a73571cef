//! Dimension suffix encoding.
//!
//! Every artifact name carries `{scale}x-{lw}x{lh}-{sw}x{sh}` so later stages
//! can recover the slide geometry without reopening the slide.
//!
//! Decoding splits the file stem on `-` and looks for the last run of three
//! segments shaped `{n}x`, `{n}x{n}`, `{n}x{n}`. The slide prefix and the
//! zero-padded id never contain an `x` between digits, so the encoder's own
//! output always decodes to the values it was built from, and names with a
//! trailing marker (`-filtered`, `-tile_summary`) decode the same way.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::NameError;

/// Scale factor plus large and small dimensions, as embedded in a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DimensionSuffix {
    pub scale: u32,
    pub large: (u32, u32),
    pub small: (u32, u32),
}

impl DimensionSuffix {
    pub fn new(scale: u32, large: (u32, u32), small: (u32, u32)) -> Self {
        Self {
            scale,
            large,
            small,
        }
    }

    /// Suffix for a slide of `large` dimensions downsampled by `scale`.
    ///
    /// The small dimensions are floored. Returns `None` for a zero scale.
    pub fn from_large(scale: u32, large: (u32, u32)) -> Option<Self> {
        let small = scaled_dimensions(large, scale)?;
        Some(Self::new(scale, large, small))
    }
}

impl fmt::Display for DimensionSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x-{}x{}-{}x{}",
            self.scale, self.large.0, self.large.1, self.small.0, self.small.1
        )
    }
}

/// `(floor(w / scale), floor(h / scale))`, or `None` for a zero scale.
pub fn scaled_dimensions(large: (u32, u32), scale: u32) -> Option<(u32, u32)> {
    if scale == 0 {
        return None;
    }
    Some((large.0 / scale, large.1 / scale))
}

/// Format the dimension suffix.
pub fn encode(scale: u32, large: (u32, u32), small: (u32, u32)) -> String {
    DimensionSuffix::new(scale, large, small).to_string()
}

/// Recover the dimension suffix from an artifact name or path.
///
/// Only the final path component is inspected; its extension is ignored.
pub fn decode(name: &str) -> Result<DimensionSuffix, NameError> {
    let malformed = || NameError::MalformedArtifactName {
        name: name.to_string(),
    };

    let file_name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(malformed)?;
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => file_name,
    };

    let segments: Vec<&str> = stem.split('-').collect();

    segments
        .windows(3)
        .rev()
        .find_map(|window| parse_window(window[0], window[1], window[2]))
        .ok_or_else(malformed)
}

fn parse_window(scale: &str, large: &str, small: &str) -> Option<DimensionSuffix> {
    let scale = parse_number(scale.strip_suffix('x')?)?;
    let large = parse_pair(large)?;
    let small = parse_pair(small)?;
    Some(DimensionSuffix::new(scale, large, small))
}

fn parse_pair(segment: &str) -> Option<(u32, u32)> {
    let (w, h) = segment.split_once('x')?;
    Some((parse_number(w)?, parse_number(h)?))
}

/// Decimal digits only; no sign, no whitespace.
fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// =============================================================================
// Tests
// =============================================================================

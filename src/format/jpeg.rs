//! JPEG tile stream preparation.
//!
//! Aperio writes tiles as *abbreviated* JPEG streams: the quantization (DQT)
//! and Huffman (DHT) tables are stored once per level in the `JPEGTables` tag
//! and left out of every tile. A decodable stream is
//! `SOI + tables body + tile body + EOI`, i.e. the tables without their EOI
//! followed by the tile without its SOI.
//!
//! Aperio also stores some levels with RGB photometric interpretation but no
//! Adobe marker, which decoders would treat as YCbCr. Those streams get an
//! APP14 segment declaring "no transform".

use std::borrow::Cow;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const DHT: u8 = 0xC4;
const DQT: u8 = 0xDB;
const SOS: u8 = 0xDA;
const APP14: u8 = 0xEE;

/// APP14 "Adobe" segment with color transform 0 (components are RGB).
const ADOBE_RGB_SEGMENT: [u8; 16] = [
    0xFF, APP14, 0x00, 0x0E, b'A', b'd', b'o', b'b', b'e', 0x00, 0x64, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

/// What the segments before the first scan declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamHeader {
    /// DQT or DHT seen before SOS
    pub has_tables: bool,

    /// Adobe APP14 segment seen before SOS
    pub has_adobe_marker: bool,
}

/// Walk the marker segments of a JPEG stream up to its first scan.
///
/// Returns `None` if the data does not start with SOI.
pub fn scan_header(data: &[u8]) -> Option<StreamHeader> {
    if data.len() < 2 || data[..2] != SOI {
        return None;
    }

    let mut header = StreamHeader::default();
    let mut pos = 2;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            // Not on a marker boundary; stop rather than guess
            break;
        }
        let marker = data[pos + 1];
        if marker == 0xFF {
            // Fill byte
            pos += 1;
            continue;
        }

        match marker {
            SOS => break,
            DQT | DHT => header.has_tables = true,
            APP14 if data[pos + 4..].starts_with(b"Adobe") => header.has_adobe_marker = true,
            _ => {}
        }

        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 2 + length;
    }

    Some(header)
}

/// Turn raw tile bytes into a stream a baseline decoder accepts.
///
/// `tables` is the level's JPEGTables value, if any. `rgb` requests the Adobe
/// marker for tiles whose photometric interpretation is RGB. Complete streams
/// that need no marker are returned borrowed.
pub fn prepare_tile_jpeg<'a>(tables: Option<&[u8]>, tile: &'a [u8], rgb: bool) -> Cow<'a, [u8]> {
    let Some(header) = scan_header(tile) else {
        return Cow::Borrowed(tile);
    };

    let merge_tables = match tables {
        Some(t) if !header.has_tables && t.len() >= 2 && t[..2] == SOI => Some(t),
        _ => None,
    };
    let add_marker = rgb && !header.has_adobe_marker;

    if merge_tables.is_none() && !add_marker {
        return Cow::Borrowed(tile);
    }

    let tables_body = merge_tables
        .map(|t| t[2..].strip_suffix(&EOI).unwrap_or(&t[2..]))
        .unwrap_or(&[]);
    let tile_body = &tile[2..];

    let mut out = Vec::with_capacity(2 + ADOBE_RGB_SEGMENT.len() + tables_body.len() + tile_body.len());
    out.extend_from_slice(&SOI);
    if add_marker {
        out.extend_from_slice(&ADOBE_RGB_SEGMENT);
    }
    out.extend_from_slice(tables_body);
    out.extend_from_slice(tile_body);

    Cow::Owned(out)
}

// =============================================================================
// Tests
// =============================================================================

//! Aperio SVS detection and property parsing.
//!
//! Aperio writes its properties into the first IFD's ImageDescription:
//!
//! ```text
//! Aperio Image Library v12.0.15
//! 46920x33600 [0,100 46000x32914] (256x256) JPEG/RGB Q=70|AppMag = 20|MPP = 0.4990
//! ```
//!
//! The first line names the vendor; after it come `|`-separated
//! `key = value` pairs.

use std::collections::BTreeMap;

use serde::Serialize;

/// Marker that identifies an Aperio description.
const APERIO_MARKER: &str = "Aperio";

// =============================================================================
// SlideFormat
// =============================================================================

/// Detected slide format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlideFormat {
    AperioSvs,
    GenericTiff,
}

impl SlideFormat {
    /// Classify a slide by its first ImageDescription.
    pub fn from_description(description: Option<&str>) -> Self {
        match description {
            Some(d) if d.contains(APERIO_MARKER) => SlideFormat::AperioSvs,
            _ => SlideFormat::GenericTiff,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "Aperio SVS",
            SlideFormat::GenericTiff => "Generic Pyramidal TIFF",
        }
    }
}

// =============================================================================
// SVS Metadata
// =============================================================================

/// Properties parsed from an Aperio ImageDescription.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SvsMetadata {
    /// Microns per pixel
    pub mpp: Option<f64>,

    /// Objective power (`AppMag`), e.g. 20 or 40
    pub magnification: Option<f64>,

    pub vendor: Option<String>,

    /// Every `key = value` pair, sorted by key
    pub properties: BTreeMap<String, String>,
}

impl SvsMetadata {
    pub fn parse(description: &str) -> Self {
        let mut metadata = SvsMetadata::default();

        if description.contains(APERIO_MARKER) {
            metadata.vendor = Some(APERIO_MARKER.to_string());
        }

        // The first segment is the vendor line plus the image summary
        for part in description.split('|').skip(1) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "MPP" => metadata.mpp = value.parse().ok(),
                "AppMag" => metadata.magnification = value.parse().ok(),
                _ => {}
            }
            metadata
                .properties
                .insert(key.to_string(), value.to_string());
        }

        metadata
    }

    /// Objective power as a whole number, if present.
    pub fn objective_power(&self) -> Option<u32> {
        self.magnification
            .filter(|m| m.is_finite() && *m >= 0.0)
            .map(|m| m.round() as u32)
    }
}

// =============================================================================
// Tests
// =============================================================================

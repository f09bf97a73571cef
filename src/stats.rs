//! Slide statistics and pyramid information.
//!
//! Both walk slides `1..=count` in the slide directory. A slide that fails to
//! open is logged and left out; the rest of the walk continues.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{IoError, SlideOpenError};
use crate::format::SlideFormat;
use crate::naming::SlideLayout;
use crate::slide::{open_slide, resolve_path};

// =============================================================================
// Dimension Statistics
// =============================================================================

/// Native dimensions of one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlideDimensions {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

impl SlideDimensions {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// An extreme value and the slide it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extreme {
    pub value: u64,
    pub slide: u32,
}

/// Aggregates over a set of slides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideStats {
    pub max_width: Extreme,
    pub max_height: Extreme,
    pub max_area: Extreme,
    pub min_width: Extreme,
    pub min_height: Extreme,
    pub min_area: Extreme,
    pub avg_width: f64,
    pub avg_height: f64,
    pub avg_area: f64,
    pub slides: Vec<SlideDimensions>,
}

impl SlideStats {
    /// Aggregate dimensions. The first slide reaching an extreme keeps it.
    ///
    /// Returns `None` for an empty set.
    pub fn from_dimensions(slides: Vec<SlideDimensions>) -> Option<Self> {
        let first = slides.first()?;

        let pick = |value: fn(&SlideDimensions) -> u64, better: fn(u64, u64) -> bool| {
            let mut best = Extreme {
                value: value(first),
                slide: first.id,
            };
            for slide in &slides[1..] {
                let v = value(slide);
                if better(v, best.value) {
                    best = Extreme { value: v, slide: slide.id };
                }
            }
            best
        };
        let width = |s: &SlideDimensions| s.width as u64;
        let height = |s: &SlideDimensions| s.height as u64;
        let area = |s: &SlideDimensions| s.area();
        let larger = |a: u64, b: u64| a > b;
        let smaller = |a: u64, b: u64| a < b;

        let n = slides.len() as f64;
        let mean = |value: fn(&SlideDimensions) -> u64| {
            slides.iter().map(|s| value(s) as f64).sum::<f64>() / n
        };

        Some(Self {
            max_width: pick(width, larger),
            max_height: pick(height, larger),
            max_area: pick(area, larger),
            min_width: pick(width, smaller),
            min_height: pick(height, smaller),
            min_area: pick(area, smaller),
            avg_width: mean(width),
            avg_height: mean(height),
            avg_area: mean(area),
            slides,
        })
    }

    /// Text report followed by a `slide number,width,height` CSV section.
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SlideStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, extreme) in [
            ("Max width:", self.max_width),
            ("Max height:", self.max_height),
            ("Max size:", self.max_area),
            ("Min width:", self.min_width),
            ("Min height:", self.min_height),
            ("Min size:", self.min_area),
        ] {
            writeln!(
                f,
                "{:<11} {:>14} pixels (slide #{})",
                label,
                group_thousands(extreme.value),
                extreme.slide
            )?;
        }
        for (label, avg) in [
            ("Avg width:", self.avg_width),
            ("Avg height:", self.avg_height),
            ("Avg size:", self.avg_area),
        ] {
            writeln!(f, "{:<11} {:>14} pixels", label, group_thousands(avg.round() as u64))?;
        }

        f.write_str("\nslide number,width,height\n")?;
        for slide in &self.slides {
            writeln!(f, "{},{},{}", slide.id, slide.width, slide.height)?;
        }

        Ok(())
    }
}

/// `1234567` as `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Open every slide and record its dimensions.
pub async fn collect_dimensions(config: &Config) -> Result<(Vec<SlideDimensions>, Vec<SlideOpenError>), IoError> {
    let count = SlideLayout::new(config).count_slides().await?;
    let mut dimensions = Vec::with_capacity(count as usize);
    let mut failures = Vec::new();

    for id in 1..=count {
        info!(slide = id, path = %resolve_path(config, id).display(), "opening slide");
        match open_slide(config, id).await {
            Ok(slide) => {
                let (width, height) = slide.dimensions();
                info!(slide = id, "dimensions: {} x {}", group_thousands(width as u64), group_thousands(height as u64));
                dimensions.push(SlideDimensions { id, width, height });
            }
            Err(e) => {
                warn!(slide = id, error = %e, "skipping slide");
                failures.push(e);
            }
        }
    }

    Ok((dimensions, failures))
}

/// Write the report to `<stats_dir>/stats.txt`, creating the directory.
pub async fn write_report(config: &Config, stats: &SlideStats) -> Result<PathBuf, IoError> {
    let path = SlideLayout::new(config).stats_report_path();
    tokio::fs::create_dir_all(&config.stats_dir).await?;
    tokio::fs::write(&path, stats.report()).await?;
    Ok(path)
}

// =============================================================================
// Slide Information
// =============================================================================

/// Pyramid and vendor information for one slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideInfo {
    pub id: u32,
    pub path: PathBuf,
    pub format: SlideFormat,
    pub dimensions: (u32, u32),
    pub level_count: usize,
    pub level_dimensions: Vec<(u32, u32)>,
    pub level_downsamples: Vec<f64>,
    pub objective_power: Option<u32>,
    pub associated_images: usize,
    pub properties: BTreeMap<String, String>,
}

/// Slide ids grouped by objective power.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MagnificationGroups {
    pub x20: Vec<u32>,
    pub x40: Vec<u32>,

    /// Any other power, or none recorded
    pub other: Vec<u32>,
}

impl MagnificationGroups {
    pub fn from_infos(infos: &[SlideInfo]) -> Self {
        let mut groups = Self::default();
        for info in infos {
            match info.objective_power {
                Some(20) => groups.x20.push(info.id),
                Some(40) => groups.x40.push(info.id),
                _ => groups.other.push(info.id),
            }
        }
        groups
    }
}

/// Open every slide and record its pyramid information.
pub async fn collect_info(config: &Config) -> Result<(Vec<SlideInfo>, Vec<SlideOpenError>), IoError> {
    let count = SlideLayout::new(config).count_slides().await?;
    let mut infos = Vec::with_capacity(count as usize);
    let mut failures = Vec::new();

    for id in 1..=count {
        match open_slide(config, id).await {
            Ok(slide) => infos.push(SlideInfo {
                id,
                path: resolve_path(config, id),
                format: slide.format(),
                dimensions: slide.dimensions(),
                level_count: slide.level_count(),
                level_dimensions: slide.level_dimensions(),
                level_downsamples: slide.level_downsamples(),
                objective_power: slide.metadata().objective_power(),
                associated_images: slide.associated_image_count(),
                properties: slide.metadata().properties.clone(),
            }),
            Err(e) => {
                warn!(slide = id, error = %e, "skipping slide");
                failures.push(e);
            }
        }
    }

    Ok((infos, failures))
}

// =============================================================================
// Tests
// =============================================================================

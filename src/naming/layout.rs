//! Path construction for slides and their artifacts.
//!
//! Slides are `<prefix>-<NNN>.<ext>` with a zero-padded three-digit id. Every
//! artifact keeps the `<prefix>-<NNN>-` stem followed by the dimension suffix,
//! so it can be found again by id alone.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::IoError;

use super::codec::{decode, DimensionSuffix};

/// Marker appended to the final result of filtering.
pub const FILTERED_MARKER: &str = "filtered";

/// Marker appended to tile summary images.
pub const TILE_SUMMARY_MARKER: &str = "tile_summary";

/// Name of the statistics report inside the stats directory.
pub const STATS_REPORT_NAME: &str = "stats.txt";

/// Naming rules over a [`Config`]. Never touches the filesystem except in
/// the `find_*` and `count_slides` lookups.
#[derive(Debug, Clone, Copy)]
pub struct SlideLayout<'a> {
    config: &'a Config,
}

impl<'a> SlideLayout<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// `<prefix>-<NNN>`
    pub fn slide_stem(&self, id: u32) -> String {
        format!("{}-{:03}", self.config.slide_prefix, id)
    }

    /// Source slide path for an id.
    pub fn slide_path(&self, id: u32) -> PathBuf {
        self.config.slide_dir.join(format!(
            "{}.{}",
            self.slide_stem(id),
            self.config.slide_ext
        ))
    }

    fn suffixed_name(&self, id: u32, suffix: &DimensionSuffix, marker: Option<&str>, ext: &str) -> String {
        match marker {
            Some(marker) => format!("{}-{}-{}.{}", self.slide_stem(id), suffix, marker, ext),
            None => format!("{}-{}.{}", self.slide_stem(id), suffix, ext),
        }
    }

    // -------------------------------------------------------------------------
    // Downsampled images and thumbnails
    // -------------------------------------------------------------------------

    pub fn image_path(&self, id: u32, suffix: &DimensionSuffix) -> PathBuf {
        self.config
            .image_dir
            .join(self.suffixed_name(id, suffix, None, &self.config.image_ext))
    }

    pub fn thumbnail_path(&self, id: u32, suffix: &DimensionSuffix) -> PathBuf {
        self.config
            .thumbnail_dir
            .join(self.suffixed_name(id, suffix, None, &self.config.thumbnail_ext))
    }

    // -------------------------------------------------------------------------
    // Derived artifacts
    // -------------------------------------------------------------------------

    /// `<prefix>-<NNN>-<FFF>-<info>.<ext>` in the filter directory.
    pub fn filter_image_path(&self, id: u32, filter_id: u32, info: &str) -> PathBuf {
        self.config.filter_dir.join(format!(
            "{}-{:03}-{}.{}",
            self.slide_stem(id),
            filter_id,
            info,
            self.config.image_ext
        ))
    }

    pub fn filter_thumbnail_path(&self, id: u32, filter_id: u32, info: &str) -> PathBuf {
        self.config.filter_thumbnail_dir.join(format!(
            "{}-{:03}-{}.{}",
            self.slide_stem(id),
            filter_id,
            info,
            self.config.thumbnail_ext
        ))
    }

    pub fn filter_result_path(&self, id: u32, suffix: &DimensionSuffix) -> PathBuf {
        self.config.filter_dir.join(self.suffixed_name(
            id,
            suffix,
            Some(FILTERED_MARKER),
            &self.config.image_ext,
        ))
    }

    pub fn filter_thumbnail_result_path(&self, id: u32, suffix: &DimensionSuffix) -> PathBuf {
        self.config.filter_thumbnail_dir.join(self.suffixed_name(
            id,
            suffix,
            Some(FILTERED_MARKER),
            &self.config.thumbnail_ext,
        ))
    }

    pub fn tile_summary_path(&self, id: u32, suffix: &DimensionSuffix) -> PathBuf {
        self.config.tile_summary_dir.join(self.suffixed_name(
            id,
            suffix,
            Some(TILE_SUMMARY_MARKER),
            &self.config.image_ext,
        ))
    }

    pub fn tile_summary_thumbnail_path(&self, id: u32, suffix: &DimensionSuffix) -> PathBuf {
        self.config.tile_summary_thumbnail_dir.join(self.suffixed_name(
            id,
            suffix,
            Some(TILE_SUMMARY_MARKER),
            &self.config.thumbnail_ext,
        ))
    }

    pub fn stats_report_path(&self) -> PathBuf {
        self.config.stats_dir.join(STATS_REPORT_NAME)
    }

    // -------------------------------------------------------------------------
    // Filesystem lookups
    // -------------------------------------------------------------------------

    /// Existing downsampled image for an id, found without knowing its dimensions.
    pub async fn find_image(&self, id: u32) -> Result<Option<PathBuf>, IoError> {
        self.find_artifact(&self.config.image_dir, id, &self.config.image_ext)
            .await
    }

    /// Existing thumbnail for an id, found without knowing its dimensions.
    pub async fn find_thumbnail(&self, id: u32) -> Result<Option<PathBuf>, IoError> {
        self.find_artifact(&self.config.thumbnail_dir, id, &self.config.thumbnail_ext)
            .await
    }

    /// Match `<prefix>-<NNN>-*.<ext>` whose suffix decodes with the configured
    /// scale factor. The lexicographically first match wins.
    async fn find_artifact(&self, dir: &Path, id: u32, ext: &str) -> Result<Option<PathBuf>, IoError> {
        let head = format!("{}-", self.slide_stem(id));
        let tail = format!(".{}", ext);

        let mut best: Option<String> = None;
        for name in list_file_names(dir).await? {
            if !name.starts_with(&head) || !name.ends_with(&tail) {
                continue;
            }
            match decode(&name) {
                Ok(suffix) if suffix.scale == self.config.scale_factor => {}
                _ => continue,
            }
            if best.as_ref().map_or(true, |b| name < *b) {
                best = Some(name);
            }
        }

        Ok(best.map(|name| dir.join(name)))
    }

    /// Number of files in the slide directory with the slide extension.
    ///
    /// Ids are assumed dense: slides `1..=count` exist.
    pub async fn count_slides(&self) -> Result<u32, IoError> {
        let tail = format!(".{}", self.config.slide_ext);
        let count = list_file_names(&self.config.slide_dir)
            .await?
            .iter()
            .filter(|name| name.len() > tail.len() && name.ends_with(&tail))
            .count();
        Ok(count as u32)
    }
}

/// Names of the regular files directly inside `dir`.
async fn list_file_names(dir: &Path) -> Result<Vec<String>, IoError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IoError::NotFound(dir.display().to_string())
        } else {
            IoError::Io(format!("{}: {}", dir.display(), e))
        }
    })?;

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

// =============================================================================
// Tests
// =============================================================================

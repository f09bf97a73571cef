//! Slide access by numeric id.
//!
//! ```text
//!   id ──resolve_path──▶ <slide_dir>/<prefix>-<NNN>.<ext>
//!                                    │
//!                            LocalFileReader
//!                                    │
//!                             TiffPyramid + TileData
//!                                    │
//!                                    ▼
//!                                  Slide
//! ```
//!
//! Every failure on the way, whether the file is missing or the parser
//! rejects it, surfaces as one [`SlideOpenError`].

mod handle;

use std::path::PathBuf;

use tracing::debug;

use crate::config::Config;
use crate::error::SlideOpenError;
use crate::io::LocalFileReader;
use crate::naming::SlideLayout;

pub use handle::{LevelInfo, Slide};

/// Path of a slide. Pure string construction; the file need not exist.
pub fn resolve_path(config: &Config, id: u32) -> PathBuf {
    SlideLayout::new(config).slide_path(id)
}

/// Open a slide from the configured slide directory.
pub async fn open_slide(config: &Config, id: u32) -> Result<Slide<LocalFileReader>, SlideOpenError> {
    let path = resolve_path(config, id);
    debug!(slide = id, path = %path.display(), "opening slide");

    let open_error = |reason: String| SlideOpenError {
        id,
        path: path.clone(),
        reason,
    };

    let reader = LocalFileReader::open(&path)
        .await
        .map_err(|e| open_error(e.to_string()))?;

    Slide::from_reader(id, reader)
        .await
        .map_err(|e| open_error(e.to_string()))
}

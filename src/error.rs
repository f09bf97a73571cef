use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading slide bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from the underlying filesystem
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        IoError::Io(err.to_string())
    }
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// No tiled pyramid level was found
    #[error("No pyramid levels found")]
    NoPyramidLevels,

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// A slide could not be opened.
///
/// A missing file and a file the parser rejects are reported the same way;
/// `reason` carries the underlying message for logs only.
#[derive(Debug, Clone, Error)]
#[error("Cannot open slide {id} at {}: {reason}", .path.display())]
pub struct SlideOpenError {
    pub id: u32,
    pub path: PathBuf,
    pub reason: String,
}

/// Errors from artifact filename handling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The name carries no `{scale}x-{w}x{h}-{w}x{h}` dimension suffix
    #[error("Malformed artifact name: {name}")]
    MalformedArtifactName { name: String },
}

/// Errors from work partitioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PartitionError {
    /// At least one worker is required
    #[error("Worker count must be at least 1")]
    NoWorkers,
}

/// Errors from converting a single slide
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    /// Slide file missing or unreadable
    #[error(transparent)]
    Open(#[from] SlideOpenError),

    /// Failed to read pyramid data from an opened slide
    #[error("Failed to read slide {id}: {source}")]
    Read { id: u32, source: TiffError },

    /// Tile data could not be decoded
    #[error("Failed to decode slide {id}: {message}")]
    Decode { id: u32, message: String },

    /// The scale factor leaves no pixels along one axis
    #[error("Slide {id} with dimensions {large:?} is smaller than scale factor {scale}")]
    EmptyTarget {
        id: u32,
        large: (u32, u32),
        scale: u32,
    },

    /// Destination could not be written
    #[error("Failed to write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    /// The worker running this slide's range stopped before reporting
    #[error("Worker for slide {id} aborted: {message}")]
    Aborted { id: u32, message: String },
}

impl ConvertError {
    /// Short kind label used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::Open(_) => "SlideOpenError",
            ConvertError::Read { .. } => "ReadError",
            ConvertError::Decode { .. } => "DecodeError",
            ConvertError::EmptyTarget { .. } => "EmptyTarget",
            ConvertError::Write { .. } => "IOWriteError",
            ConvertError::Aborted { .. } => "WorkerAborted",
        }
    }
}

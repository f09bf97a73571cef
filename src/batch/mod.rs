//! Batch conversion over a numbered slide range.

pub mod dispatch;
pub mod partition;

pub use dispatch::{BatchReport, Dispatcher, RangeOutcome, SlideFailure};
pub use partition::{partition, IdRange};

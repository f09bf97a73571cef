//! Splitting the slide id range across workers.
//!
//! Worker `i` of `n` ends at `ceil(i * total / n)` and starts right after
//! worker `i - 1`. Boundaries are computed in exact integer arithmetic, so
//! the last range always ends at `total` and no id is skipped or repeated.
//! Ranges differ in length by at most one, with the longer ranges first:
//! five slides on two workers split as `1..=3` and `4..=5`.

use serde::Serialize;

use crate::error::PartitionError;

/// One worker's inclusive range of slide ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IdRange {
    pub start: u32,
    pub end: u32,
}

impl IdRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    pub fn contains(&self, id: u32) -> bool {
        (self.start..=self.end).contains(&id)
    }
}

impl From<IdRange> for (u32, u32) {
    fn from(range: IdRange) -> Self {
        (range.start, range.end)
    }
}

/// `ceil(i * total / n)`
fn boundary(i: u64, total: u64, n: u64) -> u64 {
    (i * total).div_ceil(n)
}

/// Split `1..=total` into `min(workers, total)` contiguous ranges.
///
/// A `total` of zero yields an empty plan. Zero workers is an error.
pub fn partition(total: u32, workers: usize) -> Result<Vec<IdRange>, PartitionError> {
    if workers == 0 {
        return Err(PartitionError::NoWorkers);
    }

    let total = total as u64;
    let effective = (workers as u64).min(total);

    let plan = (1..=effective)
        .map(|i| {
            let start = boundary(i - 1, total, effective) + 1;
            let end = boundary(i, total, effective);
            IdRange::new(start as u32, end as u32)
        })
        .collect();

    Ok(plan)
}

// =============================================================================
// Tests
// =============================================================================

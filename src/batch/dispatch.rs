//! Running a partition plan.
//!
//! Each range runs on its own task and converts its ids one after another in
//! increasing order. Every conversion is spawned separately, so a slide that
//! fails or panics is recorded and the range moves on. The dispatcher waits
//! for every range before reporting.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{error, info, warn};

use crate::convert::{ConvertedSlide, Downsampler};
use crate::error::{ConvertError, PartitionError};

use super::partition::{partition, IdRange};

// =============================================================================
// Outcomes
// =============================================================================

/// A slide that did not convert.
#[derive(Debug, Clone)]
pub struct SlideFailure {
    pub id: u32,
    pub error: ConvertError,
}

impl Serialize for SlideFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SlideFailure", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("kind", self.error.kind())?;
        state.serialize_field("message", &self.error.to_string())?;
        state.end()
    }
}

/// What one worker did with its range.
#[derive(Debug, Clone)]
pub struct RangeOutcome {
    pub range: IdRange,
    pub converted: Vec<ConvertedSlide>,
    pub failures: Vec<SlideFailure>,
}

impl RangeOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Summary of a whole batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Number of slide ids in the plan
    pub requested: u32,

    /// Number of slides written successfully
    pub converted: u32,

    pub plan: Vec<IdRange>,

    /// Every failed slide, ordered by id
    pub failures: Vec<SlideFailure>,

    /// Ranges with at least one failed slide
    pub incomplete_ranges: Vec<IdRange>,

    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Ids a caller can convert again.
    pub fn failed_ids(&self) -> Vec<u32> {
        self.failures.iter().map(|f| f.id).collect()
    }

    fn from_outcomes(plan: Vec<IdRange>, outcomes: Vec<RangeOutcome>, elapsed: Duration) -> Self {
        let requested = plan.iter().map(IdRange::len).sum();
        let converted = outcomes.iter().map(|o| o.converted.len() as u32).sum();
        let incomplete_ranges = outcomes
            .iter()
            .filter(|o| !o.is_complete())
            .map(|o| o.range)
            .collect();

        let mut failures: Vec<SlideFailure> = outcomes.into_iter().flat_map(|o| o.failures).collect();
        failures.sort_by_key(|f| f.id);

        Self {
            requested,
            converted,
            plan,
            failures,
            incomplete_ranges,
            elapsed,
        }
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Fans slide ranges out over concurrent workers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    downsampler: Downsampler,
}

impl Dispatcher {
    pub fn new(downsampler: Downsampler) -> Self {
        Self { downsampler }
    }

    /// Convert slides `1..=total` on up to `workers` workers.
    pub async fn run(&self, total: u32, workers: usize) -> Result<BatchReport, PartitionError> {
        let plan = partition(total, workers)?;
        Ok(self.run_plan(plan).await)
    }

    /// Run an explicit plan. Ranges may be arbitrary, e.g. failed ids only.
    pub async fn run_plan(&self, plan: Vec<IdRange>) -> BatchReport {
        let started = Instant::now();
        info!(workers = plan.len(), "starting batch");

        let handles: Vec<_> = plan
            .iter()
            .enumerate()
            .map(|(index, &range)| {
                let task = index + 1;
                if range.len() == 1 {
                    info!(task, slide = range.start, "task processing slide");
                } else {
                    info!(task, start = range.start, end = range.end, "task processing slides");
                }
                (range, tokio::spawn(convert_range(self.downsampler.clone(), range)))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (range, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(start = range.start, end = range.end, error = %e, "worker aborted");
                    let message = e.to_string();
                    RangeOutcome {
                        range,
                        converted: Vec::new(),
                        failures: range
                            .ids()
                            .map(|id| SlideFailure {
                                id,
                                error: ConvertError::Aborted {
                                    id,
                                    message: message.clone(),
                                },
                            })
                            .collect(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = BatchReport::from_outcomes(plan, outcomes, started.elapsed());
        info!(
            requested = report.requested,
            converted = report.converted,
            failed = report.failures.len(),
            elapsed = ?report.elapsed,
            "batch finished"
        );
        report
    }
}

/// Convert every id of a range in order, never stopping early.
async fn convert_range(downsampler: Downsampler, range: IdRange) -> RangeOutcome {
    convert_range_with(range, move |id| {
        let downsampler = downsampler.clone();
        async move { downsampler.convert(id).await }
    })
    .await
}

/// Run `convert` for each id on its own task, awaiting them in order.
///
/// A panicking conversion fails only its own id with `ConvertError::Aborted`.
async fn convert_range_with<F, Fut>(range: IdRange, convert: F) -> RangeOutcome
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<ConvertedSlide, ConvertError>> + Send + 'static,
{
    let mut converted = Vec::new();
    let mut failures = Vec::new();

    for id in range.ids() {
        let result = match tokio::spawn(convert(id)).await {
            Ok(result) => result,
            Err(e) => {
                error!(slide = id, error = %e, "conversion aborted");
                Err(ConvertError::Aborted {
                    id,
                    message: e.to_string(),
                })
            }
        };

        match result {
            Ok(slide) => converted.push(slide),
            Err(error) => {
                warn!(slide = id, kind = error.kind(), error = %error, "conversion failed");
                failures.push(SlideFailure { id, error });
            }
        }
    }

    info!(
        start = range.start,
        end = range.end,
        converted = converted.len(),
        failed = failures.len(),
        "range done"
    );

    RangeOutcome {
        range,
        converted,
        failures,
    }
}

// =============================================================================
// Tests
// =============================================================================

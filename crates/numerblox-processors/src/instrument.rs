//! Timing and shape logging around processor calls
//!
//! Numeric code never logs its own timings; every stage invocation goes
//! through [`instrument`] instead.

use crate::error::Result;
use crate::processor::Processor;
use numerblox_data::Dataset;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Timing and shape of one stage run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Processor name
    pub processor: String,
    /// Wall-clock time of the transform
    pub elapsed: Duration,
    /// (rows, columns) before the stage
    pub input_shape: (usize, usize),
    /// (rows, columns) after the stage
    pub output_shape: (usize, usize),
}

impl StageReport {
    /// Columns added (negative when columns were dropped).
    pub const fn column_delta(&self) -> isize {
        self.output_shape.1 as isize - self.input_shape.1 as isize
    }
}

/// Run `processor` on `dataset` and record how long it took.
pub fn instrument<P: Processor + ?Sized>(
    processor: &P,
    dataset: &Dataset,
) -> Result<(Dataset, StageReport)> {
    instrument_with(processor.name(), dataset, |input| {
        processor.transform(input).map(|output| (output, ()))
    })
    .map(|(output, (), report)| (output, report))
}

/// Time a stage that returns extra data next to its snapshot.
///
/// `name` labels the report and the log line.
pub fn instrument_with<T, F>(
    name: &str,
    dataset: &Dataset,
    step: F,
) -> Result<(Dataset, T, StageReport)>
where
    F: FnOnce(&Dataset) -> Result<(Dataset, T)>,
{
    let started = Instant::now();
    let (output, extra) = step(dataset)?;
    let report = StageReport {
        processor: name.to_string(),
        elapsed: started.elapsed(),
        input_shape: dataset.shape(),
        output_shape: output.shape(),
    };
    info!(
        processor = %report.processor,
        elapsed_ms = report.elapsed.as_secs_f64() * 1e3,
        rows = report.output_shape.0,
        columns = report.output_shape.1,
        "finished step"
    );
    Ok((output, extra, report))
}

/// Processor wrapper that logs every call through [`instrument`]
#[derive(Debug, Clone)]
pub struct Instrumented<P> {
    inner: P,
}

impl<P: Processor> Instrumented<P> {
    /// Wrap a processor.
    pub const fn new(inner: P) -> Self {
        Self { inner }
    }

    /// Wrapped processor.
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    /// Run the wrapped processor and return the report alongside the output.
    pub fn transform_with_report(&self, dataset: &Dataset) -> Result<(Dataset, StageReport)> {
        instrument(&self.inner, dataset)
    }
}

impl<P: Processor> Processor for Instrumented<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        self.transform_with_report(dataset).map(|(output, _)| output)
    }
}

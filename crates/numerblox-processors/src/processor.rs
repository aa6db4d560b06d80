//! The processor abstraction.

use crate::error::Result;
use numerblox_data::Dataset;
use std::fmt;

/// One pipeline stage
///
/// A processor borrows the input snapshot and returns a new one; the input
/// is never modified. Running a processor twice on a dataset with the same
/// schema yields the same schema.
pub trait Processor: Send + Sync + fmt::Debug {
    /// Stage name used in logs, reports and errors
    fn name(&self) -> &str;

    /// Produce the next snapshot.
    fn transform(&self, dataset: &Dataset) -> Result<Dataset>;
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        (**self).transform(dataset)
    }
}

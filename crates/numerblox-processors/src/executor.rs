//! Per-era fan-out
//!
//! Eras are independent tasks. They run on a rayon pool (the global pool by
//! default, or a dedicated pool with a fixed number of workers), and their
//! results come back in era order regardless of which task finished first.

use crate::error::{EraFailure, ProcessorError, Result};
use ndarray::Array1;
use numerblox_data::{Dataset, EraFragment, EraGroup, EraOrder, EraPartitioner};
use numerblox_exposure::ExposureError;
use rayon::prelude::*;
use tracing::debug;

/// Output of one era task
#[derive(Debug, Clone)]
pub struct EraOutput<T> {
    /// Era the output belongs to
    pub group: EraGroup,
    /// Task result
    pub value: T,
}

/// Runs one task per era on a bounded worker pool
#[derive(Debug, Clone, Copy, Default)]
pub struct EraExecutor {
    partitioner: EraPartitioner,
    workers: Option<usize>,
}

impl EraExecutor {
    /// Executor using the global rayon pool and ascending era order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a dedicated pool of `workers` threads.
    ///
    /// Zero falls back to the available CPU parallelism.
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Era iteration order.
    pub const fn with_order(mut self, order: EraOrder) -> Self {
        self.partitioner = EraPartitioner::new(order);
        self
    }

    /// Partitioner used to group and recombine rows.
    pub const fn partitioner(&self) -> &EraPartitioner {
        &self.partitioner
    }

    /// Run `task` once per era of `dataset`.
    ///
    /// Every era runs to completion even if another fails. When any era
    /// fails the result is [`ProcessorError::Eras`] listing each failure.
    pub fn run<T, F>(&self, dataset: &Dataset, task: F) -> Result<Vec<EraOutput<T>>>
    where
        T: Send,
        F: Fn(&EraGroup) -> std::result::Result<T, ExposureError> + Sync,
    {
        let groups = self.partitioner.partition(dataset)?;
        let eras = groups.len();
        let results: Vec<(EraGroup, std::result::Result<T, ExposureError>)> =
            self.install(|| {
                groups
                    .into_par_iter()
                    .map(|group| {
                        let result = task(&group);
                        (group, result)
                    })
                    .collect()
            })?;

        let mut outputs = Vec::with_capacity(eras);
        let mut failures = Vec::new();
        for (group, result) in results {
            match result {
                Ok(value) => outputs.push(EraOutput { group, value }),
                Err(source) => failures.push(EraFailure {
                    era: group.key,
                    source,
                }),
            }
        }

        if failures.is_empty() {
            debug!(eras, "era tasks finished");
            Ok(outputs)
        } else {
            Err(ProcessorError::Eras(failures))
        }
    }

    /// Reassemble per-era score vectors into one column in row order.
    pub fn recombine(&self, outputs: Vec<EraOutput<Array1<f64>>>, n_rows: usize) -> Result<Vec<f64>> {
        let fragments = outputs
            .into_iter()
            .map(|output| EraFragment {
                key: output.group.key,
                rows: output.group.rows,
                values: output.value.to_vec(),
            })
            .collect();
        Ok(self.partitioner.recombine(fragments, n_rows)?)
    }

    fn install<R, OP>(&self, op: OP) -> Result<R>
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match self.workers {
            None => Ok(op()),
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| ProcessorError::InvalidConfig(format!("worker pool: {e}")))?;
                Ok(pool.install(op))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numerblox_data::{EraKey, ErrorKind};
    use polars::prelude::*;

    fn dataset() -> Dataset {
        let frame = DataFrame::new(vec![
            Column::new("era".into(), &[2i64, 1, 2, 3, 1, 3]),
            Column::new("prediction".into(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
        ])
        .unwrap();
        Dataset::new(frame).unwrap()
    }

    #[test]
    fn test_outputs_in_era_order() {
        let outputs = EraExecutor::new()
            .with_workers(2)
            .run(&dataset(), |group| Ok(group.len()))
            .unwrap();
        let keys: Vec<_> = outputs.iter().map(|o| o.group.key.clone()).collect();
        assert_eq!(keys, vec![EraKey::Int(1), EraKey::Int(2), EraKey::Int(3)]);
        assert!(outputs.iter().all(|o| o.value == 2));
    }

    #[test]
    fn test_collects_every_failure() {
        let err = EraExecutor::new()
            .run(&dataset(), |group| match group.key {
                EraKey::Int(2) => Ok(()),
                _ => Err(ExposureError::NonFinite("scores")),
            })
            .unwrap_err();
        match &err {
            ProcessorError::Eras(failures) => {
                let eras: Vec<_> = failures.iter().map(|f| f.era.clone()).collect();
                assert_eq!(eras, vec![EraKey::Int(1), EraKey::Int(3)]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.kind(), ErrorKind::Numerical);
    }

    #[test]
    fn test_recombine_restores_row_order() {
        let dataset = dataset();
        let scores = dataset.column_f64("prediction").unwrap();
        let executor = EraExecutor::new();
        let outputs = executor
            .run(&dataset, |group| {
                Ok(Array1::from_iter(group.rows.iter().map(|&r| scores[r] * 10.0)))
            })
            .unwrap();
        let column = executor.recombine(outputs, dataset.height()).unwrap();
        assert_eq!(column, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
    }
}

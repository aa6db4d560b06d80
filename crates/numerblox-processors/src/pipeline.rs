//! Processor pipeline
//!
//! Runs an ordered list of processors, feeding each stage the snapshot the
//! previous one returned. The first failure aborts the run; no later stage
//! sees a partially transformed dataset.

use crate::error::PipelineError;
use crate::instrument::{StageReport, instrument};
use crate::processor::Processor;
use numerblox_data::Dataset;
use tracing::{error, info};

/// Ordered sequence of processors
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Processor>>,
}

impl Pipeline {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage (builder style).
    pub fn with_stage<P: Processor + 'static>(mut self, processor: P) -> Self {
        self.stages.push(Box::new(processor));
        self
    }

    /// Append a boxed stage.
    pub fn push(&mut self, processor: Box<dyn Processor>) {
        self.stages.push(processor);
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|p| p.name()).collect()
    }

    /// Run every stage and return the final snapshot.
    pub fn run(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        self.run_with_reports(dataset).map(|(output, _)| output)
    }

    /// Run every stage, returning the final snapshot and one report per stage.
    pub fn run_with_reports(
        &self,
        dataset: &Dataset,
    ) -> Result<(Dataset, Vec<StageReport>), PipelineError> {
        let mut current = dataset.clone();
        let mut reports = Vec::with_capacity(self.stages.len());

        for (index, stage) in self.stages.iter().enumerate() {
            match instrument(stage.as_ref(), &current) {
                Ok((next, report)) => {
                    current = next;
                    reports.push(report);
                }
                Err(source) => {
                    error!(processor = stage.name(), index, kind = %source.kind(), "stage failed: {source}");
                    return Err(PipelineError::Stage {
                        processor: stage.name().to_string(),
                        index,
                        source,
                    });
                }
            }
        }

        info!(stages = reports.len(), shape = ?current.shape(), "pipeline finished");
        Ok((current, reports))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProcessorError, Result};
    use numerblox_data::ErrorKind;
    use polars::prelude::*;

    #[derive(Debug)]
    struct AddConstant {
        name: String,
        value: f64,
    }

    impl Processor for AddConstant {
        fn name(&self) -> &str {
            "AddConstant"
        }

        fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
            Ok(dataset.with_f64_column(&self.name, vec![self.value; dataset.height()])?)
        }
    }

    #[derive(Debug)]
    struct Fail;

    impl Processor for Fail {
        fn name(&self) -> &str {
            "Fail"
        }

        fn transform(&self, _dataset: &Dataset) -> Result<Dataset> {
            Err(ProcessorError::InvalidConfig("always fails".to_string()))
        }
    }

    fn dataset() -> Dataset {
        let frame = DataFrame::new(vec![
            Column::new("era".into(), &[1i64, 1, 2]),
            Column::new("feature_a".into(), &[0.0, 0.5, 1.0]),
            Column::new("prediction".into(), &[0.2, 0.4, 0.6]),
        ])
        .unwrap();
        Dataset::new(frame).unwrap()
    }

    #[test]
    fn test_runs_stages_in_order() {
        let pipeline = Pipeline::new()
            .with_stage(AddConstant {
                name: "prediction_a".to_string(),
                value: 1.0,
            })
            .with_stage(AddConstant {
                name: "prediction_b".to_string(),
                value: 2.0,
            });
        assert_eq!(pipeline.names(), vec!["AddConstant", "AddConstant"]);

        let input = dataset();
        let (output, reports) = pipeline.run_with_reports(&input).unwrap();
        assert_eq!(output.prediction_cols(), ["prediction", "prediction_a", "prediction_b"]);
        assert_eq!(input.shape(), (3, 3));
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].input_shape, (3, 3));
        assert_eq!(reports[1].output_shape, (3, 5));
        assert_eq!(reports[1].column_delta(), 1);
    }

    #[test]
    fn test_aborts_at_failing_stage() {
        let pipeline = Pipeline::new()
            .with_stage(AddConstant {
                name: "prediction_a".to_string(),
                value: 1.0,
            })
            .with_stage(Fail)
            .with_stage(AddConstant {
                name: "prediction_c".to_string(),
                value: 3.0,
            });
        let err = pipeline.run(&dataset()).unwrap_err();
        assert_eq!(err.processor(), "Fail");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err, PipelineError::Stage { index: 1, .. }));
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        let output = pipeline.run(&dataset()).unwrap();
        assert_eq!(output.shape(), (3, 3));
    }
}

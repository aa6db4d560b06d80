//! Feature Neutralizer
//!
//! Per era: rank-gaussianize the prediction, remove a proportion of its
//! linear exposure to the era-demeaned feature columns, then scale into `[0, 1]`.

use super::exposure_matrix;
use crate::error::Result;
use crate::executor::EraExecutor;
use crate::naming::neutralized_column;
use crate::processor::Processor;
use ndarray::{Array1, Axis};
use numerblox_data::Dataset;
use numerblox_exposure::scale::unit_interval;
use numerblox_exposure::{GaussianizeConfig, OrthogonalNeutralizer, RankGaussianizer};
use tracing::info;

/// Writes `<pred_name>_neutralized_<proportion>` next to the prediction
#[derive(Debug, Clone)]
pub struct FeatureNeutralizer {
    pred_name: String,
    feature_names: Option<Vec<String>>,
    neutralizer: OrthogonalNeutralizer,
    gaussianize: GaussianizeConfig,
    executor: EraExecutor,
}

impl FeatureNeutralizer {
    /// Neutralize `pred_name` against all feature columns.
    ///
    /// # Errors
    /// [`ProcessorError::Exposure`](crate::ProcessorError::Exposure) unless `proportion ∈ [0, 1]`.
    pub fn new(pred_name: impl Into<String>, proportion: f64) -> Result<Self> {
        Ok(Self {
            pred_name: pred_name.into(),
            feature_names: None,
            neutralizer: OrthogonalNeutralizer::new(proportion)?,
            gaussianize: GaussianizeConfig::default(),
            executor: EraExecutor::default(),
        })
    }

    /// Neutralize against these columns instead of the dataset's features.
    pub fn with_features(mut self, feature_names: Vec<String>) -> Self {
        self.feature_names = Some(feature_names);
        self
    }

    /// Rank transform applied before neutralizing.
    pub const fn with_gaussianize(mut self, gaussianize: GaussianizeConfig) -> Self {
        self.gaussianize = gaussianize;
        self
    }

    /// Executor used for the per-era fan-out.
    pub const fn with_executor(mut self, executor: EraExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Name of the column this processor writes.
    pub fn new_col_name(&self) -> String {
        neutralized_column(&self.pred_name, self.neutralizer.proportion())
    }
}

impl Processor for FeatureNeutralizer {
    fn name(&self) -> &str {
        "FeatureNeutralizer"
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        let features = self
            .feature_names
            .as_deref()
            .unwrap_or_else(|| dataset.feature_cols());
        let exposures = exposure_matrix(dataset, features)?;
        let scores = dataset.column_f64(&self.pred_name)?;
        let gaussianizer = RankGaussianizer::new(self.gaussianize);

        let outputs = self.executor.run(dataset, |era| {
            let era_scores = scores.select(Axis(0), &era.rows);
            let era_exposures = exposures.select(Axis(0), &era.rows);
            // Demeaned within the era so p = 1 leaves zero correlation
            let center = era_exposures
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(era_exposures.ncols()));
            let era_exposures = era_exposures - &center;
            let ranked = gaussianizer.transform(era_scores.view())?;
            let neutral = self.neutralizer.neutralize(&ranked, &era_exposures)?;
            Ok(unit_interval(neutral.view()))
        })?;

        let column = self.executor.recombine(outputs, dataset.height())?;
        let new_col = self.new_col_name();
        info!(
            pred_name = %self.pred_name,
            proportion = self.neutralizer.proportion(),
            column = %new_col,
            "neutralized predictions"
        );
        Ok(dataset.with_f64_column(&new_col, column)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessorError;
    use numerblox_data::{EraPartitioner, ErrorKind};
    use numerblox_exposure::{feature_exposures, max_abs};
    use polars::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn dataset() -> Dataset {
        let frame = DataFrame::new(vec![
            Column::new("era".into(), &["0001", "0001", "0001", "0002", "0002", "0002"]),
            Column::new("feature_a".into(), &[0.0, 0.5, 1.0, 1.0, 0.5, 0.0]),
            Column::new("feature_b".into(), &[0.25, 1.0, 0.0, 0.75, 0.0, 0.5]),
            Column::new("prediction".into(), &[0.1, 0.5, 0.9, 0.3, 0.2, 0.4]),
        ])
        .unwrap();
        Dataset::new(frame).unwrap()
    }

    #[test]
    fn test_writes_new_column_in_unit_interval() {
        let input = dataset();
        let output = FeatureNeutralizer::new("prediction", 0.5)
            .unwrap()
            .transform(&input)
            .unwrap();
        assert_eq!(
            output.prediction_cols(),
            ["prediction", "prediction_neutralized_0.5"]
        );
        let values = output.column_f64("prediction_neutralized_0.5").unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        // Source column untouched
        assert_eq!(
            output.column_f64("prediction").unwrap(),
            input.column_f64("prediction").unwrap()
        );
    }

    #[test]
    fn test_rejects_bad_proportion() {
        let err = FeatureNeutralizer::new("prediction", 2.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_missing_prediction_column() {
        let err = FeatureNeutralizer::new("prediction_missing", 0.5)
            .unwrap()
            .transform(&dataset())
            .unwrap_err();
        assert!(matches!(err, ProcessorError::Data(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_is_idempotent_on_schema() {
        let neutralizer = FeatureNeutralizer::new("prediction", 1.0).unwrap();
        let once = neutralizer.transform(&dataset()).unwrap();
        let twice = neutralizer.transform(&once).unwrap();
        assert_eq!(once.shape(), twice.shape());
    }

    #[test]
    fn test_full_neutralization_removes_exposure_per_era() {
        let mut rng = StdRng::seed_from_u64(11);
        let rows = 300;
        let eras: Vec<i64> = (0..rows).map(|i| (i % 3) as i64).collect();
        let features: Vec<Vec<f64>> = (0..6)
            .map(|_| (0..rows).map(|_| rng.gen_range(0.0..1.0)).collect())
            .collect();
        let prediction: Vec<f64> = (0..rows)
            .map(|i| features[0][i] + 0.5 * features[1][i] + rng.gen_range(-0.2..0.2))
            .collect();
        let mut columns = vec![Column::new("era".into(), eras)];
        for (j, values) in features.into_iter().enumerate() {
            columns.push(Column::new(format!("feature_{j}").into(), values));
        }
        columns.push(Column::new("prediction".into(), prediction));
        let input = Dataset::new(DataFrame::new(columns).unwrap()).unwrap();

        let output = FeatureNeutralizer::new("prediction", 1.0)
            .unwrap()
            .transform(&input)
            .unwrap();
        let scores = output.column_f64("prediction_neutralized_1.0").unwrap();
        let matrix = output.matrix(output.feature_cols()).unwrap();
        for group in EraPartitioner::default().partition(&output).unwrap() {
            let s = scores.select(Axis(0), &group.rows);
            let f = matrix.select(Axis(0), &group.rows);
            let exposures = feature_exposures(s.view(), f.view()).unwrap();
            assert!(max_abs(exposures.view()) < 1e-6, "era {}", group.key);
        }
    }

    #[test]
    fn test_rejects_empty_feature_list() {
        let err = FeatureNeutralizer::new("prediction", 0.5)
            .unwrap()
            .with_features(vec![])
            .transform(&dataset())
            .unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidConfig(_)));
    }
}

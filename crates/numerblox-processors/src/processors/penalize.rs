//! Feature Penalizer
//!
//! Per era: fit a linear correction that caps every feature exposure of the
//! prediction at `max_exposure`, then write the result under one column per
//! model id.

use super::exposure_matrix;
use crate::error::{ProcessorError, Result};
use crate::executor::{EraExecutor, EraOutput};
use crate::naming::penalized_column;
use crate::processor::Processor;
use ndarray::{Array1, Axis};
use numerblox_data::{Dataset, EraKey};
use numerblox_exposure::{ExposurePenalizer, PenaltyConfig, PenaltyReport};
use std::collections::HashMap;
use tracing::info;

/// Weights reused instead of fitting
#[derive(Debug, Clone)]
pub enum WarmStart {
    /// Same weights for every era
    Shared(Array1<f64>),
    /// Weights per era; eras without an entry are fitted
    PerEra(HashMap<EraKey, Array1<f64>>),
}

impl WarmStart {
    fn weights_for(&self, era: &EraKey) -> Option<&Array1<f64>> {
        match self {
            Self::Shared(weights) => Some(weights),
            Self::PerEra(by_era) => by_era.get(era),
        }
    }
}

/// Fit outcome for one era
#[derive(Debug, Clone)]
pub struct EraPenalty {
    /// Era value
    pub era: EraKey,
    /// Fitted (or reused) weights
    pub weights: Array1<f64>,
    /// Fit diagnostics
    pub report: PenaltyReport,
}

/// Collect per-era weights for a later warm start.
pub fn warm_start_from(penalties: &[EraPenalty]) -> WarmStart {
    WarmStart::PerEra(
        penalties
            .iter()
            .map(|p| (p.era.clone(), p.weights.clone()))
            .collect(),
    )
}

/// Writes `prediction_<pred_name>_<model_id>_FP_<max_exposure>` per model id
#[derive(Debug, Clone)]
pub struct FeaturePenalizer {
    model_ids: Vec<String>,
    pred_name: String,
    feature_names: Option<Vec<String>>,
    penalizer: ExposurePenalizer,
    warm_start: Option<WarmStart>,
    executor: EraExecutor,
}

impl FeaturePenalizer {
    /// Penalize `pred_name` for every id in `model_ids`.
    ///
    /// # Errors
    /// * [`ProcessorError::InvalidConfig`] for an empty model list
    /// * [`ProcessorError::Exposure`] for an invalid penalty configuration
    pub fn new(
        model_ids: Vec<String>,
        pred_name: impl Into<String>,
        config: PenaltyConfig,
    ) -> Result<Self> {
        if model_ids.is_empty() {
            return Err(ProcessorError::InvalidConfig(
                "at least one model id is required".to_string(),
            ));
        }
        Ok(Self {
            model_ids,
            pred_name: pred_name.into(),
            feature_names: None,
            penalizer: ExposurePenalizer::new(config)?,
            warm_start: None,
            executor: EraExecutor::default(),
        })
    }

    /// Penalize against these columns instead of the dataset's features.
    pub fn with_features(mut self, feature_names: Vec<String>) -> Self {
        self.feature_names = Some(feature_names);
        self
    }

    /// Reuse weights from an earlier fit.
    pub fn with_warm_start(mut self, warm_start: WarmStart) -> Self {
        self.warm_start = Some(warm_start);
        self
    }

    /// Executor used for the per-era fan-out.
    pub const fn with_executor(mut self, executor: EraExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Names of the columns this processor writes, one per model id.
    pub fn new_col_names(&self) -> Vec<String> {
        let max_exposure = self.penalizer.config().max_exposure;
        self.model_ids
            .iter()
            .map(|model| penalized_column(&self.pred_name, model, max_exposure))
            .collect()
    }

    /// Penalize and return the per-era fit outcomes with the new snapshot.
    pub fn penalize_dataset(&self, dataset: &Dataset) -> Result<(Dataset, Vec<EraPenalty>)> {
        let features = self
            .feature_names
            .as_deref()
            .unwrap_or_else(|| dataset.feature_cols());
        let exposures = exposure_matrix(dataset, features)?;
        let scores = dataset.column_f64(&self.pred_name)?;

        let outputs = self.executor.run(dataset, |era| {
            let era_scores = scores.select(Axis(0), &era.rows);
            let era_exposures = exposures.select(Axis(0), &era.rows);
            let warm = self
                .warm_start
                .as_ref()
                .and_then(|w| w.weights_for(&era.key));
            self.penalizer
                .penalize_with(&era_scores, &era_exposures, warm)
        })?;

        let mut penalties = Vec::with_capacity(outputs.len());
        let mut score_outputs = Vec::with_capacity(outputs.len());
        for output in outputs {
            let penalized = output.value;
            penalties.push(EraPenalty {
                era: output.group.key.clone(),
                weights: penalized.weights,
                report: penalized.report,
            });
            score_outputs.push(EraOutput {
                group: output.group,
                value: penalized.scores,
            });
        }
        let column = self.executor.recombine(score_outputs, dataset.height())?;

        let worst = penalties
            .iter()
            .map(|p| p.report.final_max_exposure)
            .fold(0.0, f64::max);
        let incomplete = penalties
            .iter()
            .filter(|p| !p.report.stop.is_complete())
            .count();
        info!(
            pred_name = %self.pred_name,
            max_exposure = self.penalizer.config().max_exposure,
            eras = penalties.len(),
            worst_exposure = worst,
            incomplete,
            "penalized predictions"
        );

        let mut output = dataset.clone();
        for name in self.new_col_names() {
            output = output.with_f64_column(&name, column.clone())?;
        }
        Ok((output, penalties))
    }
}

impl Processor for FeaturePenalizer {
    fn name(&self) -> &str {
        "FeaturePenalizer"
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        self.penalize_dataset(dataset).map(|(output, _)| output)
    }
}

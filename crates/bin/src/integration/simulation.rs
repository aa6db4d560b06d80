//! Synthetic neutralize/penalize runs.
//!
//! Builds a seeded panel, neutralizes the prediction, penalizes the
//! neutralized column and measures per-era exposure of every stage.

use numerblox::{ExposureSummary, SummaryError, SyntheticPanel};
use numerblox_data::DataError;
use numerblox_exposure::{GaussianizeConfig, PenaltyConfig, StopReason};
use numerblox_processors::{
    EraExecutor, EraPenalty, FeatureNeutralizer, FeaturePenalizer, Pipeline, PipelineError,
    Processor, ProcessorError, StageReport, instrument_with,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Error type for simulation runs.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SimulationError {
    /// Penalty config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Penalty config file is not valid JSON for [`PenaltyConfig`].
    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Panel generation failed.
    #[error(transparent)]
    Data(#[from] DataError),
    /// A processor failed outside the pipeline.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    /// A pipeline stage failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Exposure measurement failed.
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

/// Everything the `simulate` command needs.
#[derive(Debug, Clone)]
pub(crate) struct SimulationOptions {
    pub panel: SyntheticPanel,
    pub proportion: f64,
    pub max_exposure: Option<f64>,
    pub budget: Option<usize>,
    pub deadline_ms: Option<u64>,
    pub model_ids: Vec<String>,
    pub config: Option<PathBuf>,
    pub workers: Option<usize>,
    pub gaussianize: bool,
}

impl SimulationOptions {
    /// Penalty settings: file first, then flag overrides.
    pub(crate) fn penalty_config(&self) -> Result<PenaltyConfig, SimulationError> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| {
                    SimulationError::ConfigIo {
                        path: path.clone(),
                        source,
                    }
                })?;
                serde_json::from_str(&raw).map_err(|source| SimulationError::ConfigParse {
                    path: path.clone(),
                    source,
                })?
            }
            None => PenaltyConfig::default(),
        };
        if let Some(max_exposure) = self.max_exposure {
            config.max_exposure = max_exposure;
        }
        if let Some(budget) = self.budget {
            config.iteration_budget = budget;
        }
        if let Some(ms) = self.deadline_ms {
            config.deadline = Some(Duration::from_millis(ms));
        }
        if !self.gaussianize {
            config.gaussianize = false;
        }
        Ok(config)
    }

    fn executor(&self) -> EraExecutor {
        self.workers
            .map_or_else(EraExecutor::new, |w| EraExecutor::new().with_workers(w))
    }
}

/// Fit diagnostics of one era, flattened for printing.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EraFit {
    pub era: String,
    pub iterations: usize,
    pub loss: f64,
    pub stop: StopReason,
    pub start_max_exposure: f64,
    pub final_max_exposure: f64,
    pub elapsed_ms: f64,
}

impl From<&EraPenalty> for EraFit {
    fn from(penalty: &EraPenalty) -> Self {
        Self {
            era: penalty.era.to_string(),
            iterations: penalty.report.iterations,
            loss: penalty.report.loss,
            stop: penalty.report.stop,
            start_max_exposure: penalty.report.start_max_exposure,
            final_max_exposure: penalty.report.final_max_exposure,
            elapsed_ms: penalty.report.elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Result of a `simulate` run.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimulationOutcome {
    pub panel: SyntheticPanel,
    pub penalty: PenaltyConfig,
    pub stages: Vec<StageReport>,
    pub fits: Vec<EraFit>,
    pub summary: ExposureSummary,
}

impl SimulationOutcome {
    /// Eras whose fit ended before the loss reached zero.
    pub(crate) fn incomplete(&self) -> usize {
        self.fits.iter().filter(|f| !f.stop.is_complete()).count()
    }
}

impl fmt::Display for SimulationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Panel: {} eras x {} rows, {} features (seed {})",
            self.panel.eras, self.panel.rows_per_era, self.panel.features, self.panel.seed
        )?;
        writeln!(f)?;
        writeln!(f, "Stages")?;
        for stage in &self.stages {
            writeln!(
                f,
                "  {:<20} {:>10.2} ms  +{} column(s)",
                stage.processor,
                stage.elapsed.as_secs_f64() * 1e3,
                stage.column_delta()
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Penalty fits (cap {})", self.penalty.max_exposure)?;
        writeln!(
            f,
            "  {:<8} {:>10} {:>12} {:>10} {:>10}  stop",
            "era", "iters", "loss", "start", "final"
        )?;
        for fit in &self.fits {
            writeln!(
                f,
                "  {:<8} {:>10} {:>12.3e} {:>10.4} {:>10.4}  {}",
                fit.era,
                fit.iterations,
                fit.loss,
                fit.start_max_exposure,
                fit.final_max_exposure,
                fit.stop
            )?;
        }
        let incomplete = self.incomplete();
        if incomplete > 0 {
            writeln!(f, "  {incomplete} era(s) stopped before convergence")?;
        }
        writeln!(f)?;
        write!(f, "{}", self.summary)
    }
}

/// Run the neutralize then penalize pipeline on a synthetic panel.
pub(crate) fn run_simulation(
    options: &SimulationOptions,
) -> Result<SimulationOutcome, SimulationError> {
    let penalty = options.penalty_config()?;
    let executor = options.executor();
    let dataset = options.panel.build()?;

    let neutralizer = FeatureNeutralizer::new("prediction", options.proportion)?
        .with_gaussianize(GaussianizeConfig {
            gaussianize: options.gaussianize,
        })
        .with_executor(executor);
    let neutral_col = neutralizer.new_col_name();
    let (neutralized, mut stages) = Pipeline::new()
        .with_stage(neutralizer)
        .run_with_reports(&dataset)?;

    let penalizer = FeaturePenalizer::new(options.model_ids.clone(), neutral_col.clone(), penalty)?
        .with_executor(executor);
    let penalized_cols = penalizer.new_col_names();
    let (penalized, penalties, stage) = instrument_with(penalizer.name(), &neutralized, |input| {
        penalizer.penalize_dataset(input)
    })?;
    stages.push(stage);

    let mut columns = vec!["prediction".to_string(), neutral_col];
    // Every model id holds the same values
    columns.extend(penalized_cols.into_iter().take(1));
    let summary = ExposureSummary::from_dataset(&penalized, &columns)?;

    Ok(SimulationOutcome {
        panel: options.panel,
        penalty,
        stages,
        fits: penalties.iter().map(EraFit::from).collect(),
        summary,
    })
}

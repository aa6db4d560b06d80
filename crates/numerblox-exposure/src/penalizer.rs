//! Exposure penalization
//!
//! Fits a bias-free linear model `w` over the shifted exposures
//! `E − 0.5` so that the adjusted scores `s − (E − 0.5)·w` keep every
//! feature exposure within `±max_exposure`. Features whose starting exposure
//! is already inside the cap are only prevented from growing past it, so
//! the adjustment stays as small as the cap allows.

use crate::error::{ExposureError, Result};
use crate::exposure::{ExposureGeometry, LossGradient, max_abs};
use crate::gaussianize::{GaussianizeConfig, RankGaussianizer};
use crate::optimizer::{Adamax, AdamaxConfig};
use crate::scale::unit_interval;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The deadline is only polled every this many iterations.
const DEADLINE_POLL: usize = 256;

/// Configuration for [`ExposurePenalizer`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyConfig {
    /// Exposure cap per feature, in `[0, 1]` (default: 0.1)
    pub max_exposure: f64,
    /// Maximum optimizer iterations per era (default: 1,000,000)
    pub iteration_budget: usize,
    /// Loss below which the fit counts as converged (default: 1e-7)
    pub tolerance: f64,
    /// Optimizer hyperparameters
    pub optimizer: AdamaxConfig,
    /// Optional wall-clock limit per era
    pub deadline: Option<Duration>,
    /// Rank-transform scores before fitting; when false the raw scores are
    /// fitted (default: true)
    pub normalize: bool,
    /// Map ranks through the inverse normal CDF (default: true)
    pub gaussianize: bool,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            max_exposure: 0.1,
            iteration_budget: 1_000_000,
            tolerance: 1e-7,
            optimizer: AdamaxConfig::default(),
            deadline: None,
            normalize: true,
            gaussianize: true,
        }
    }
}

impl PenaltyConfig {
    /// Config with the given exposure cap and defaults elsewhere.
    pub fn with_max_exposure(max_exposure: f64) -> Self {
        Self {
            max_exposure,
            ..Self::default()
        }
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    /// [`ExposureError::InvalidParameter`] for a cap outside `[0, 1]`, a
    /// negative or non-finite tolerance, or invalid optimizer settings.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_exposure) {
            return Err(ExposureError::InvalidParameter(format!(
                "max_exposure must lie in [0, 1], got {}",
                self.max_exposure
            )));
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return Err(ExposureError::InvalidParameter(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        self.optimizer.validate()
    }
}

/// Why the fit stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Loss fell below the tolerance
    Converged,
    /// Iteration budget used up; weights are best effort
    BudgetExhausted,
    /// Deadline elapsed; weights are best effort
    DeadlineElapsed,
    /// Supplied weights were applied without fitting
    WarmStart,
    /// No exposure columns, scores passed through
    NoExposure,
}

impl StopReason {
    /// Whether the weights came out of a completed fit or were supplied.
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Converged | Self::WarmStart | Self::NoExposure)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::BudgetExhausted => "budget exhausted",
            Self::DeadlineElapsed => "deadline elapsed",
            Self::WarmStart => "warm start",
            Self::NoExposure => "no exposure",
        };
        f.write_str(s)
    }
}

/// Outcome of penalizing one era
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyReport {
    /// Optimizer iterations run
    pub iterations: usize,
    /// Loss at the returned weights
    pub loss: f64,
    /// Why the fit stopped
    pub stop: StopReason,
    /// Largest absolute exposure before adjustment
    pub start_max_exposure: f64,
    /// Largest absolute exposure after adjustment
    pub final_max_exposure: f64,
    /// Wall-clock time spent
    pub elapsed: Duration,
}

/// Penalized scores with the fitted model
#[derive(Debug, Clone)]
pub struct Penalized {
    /// Adjusted scores, min-max scaled to `[0, 1]`
    pub scores: Array1<f64>,
    /// Linear model weights, one per exposure column
    pub weights: Array1<f64>,
    /// Fit diagnostics
    pub report: PenaltyReport,
}

/// Iterative exposure penalizer for one era
#[derive(Debug, Clone, Copy)]
pub struct ExposurePenalizer {
    config: PenaltyConfig,
}

impl ExposurePenalizer {
    /// Create a penalizer.
    ///
    /// # Errors
    /// See [`PenaltyConfig::validate`].
    pub fn new(config: PenaltyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub const fn config(&self) -> &PenaltyConfig {
        &self.config
    }

    /// Fit a fresh linear model and adjust `scores`.
    pub fn penalize(&self, scores: &Array1<f64>, exposures: &Array2<f64>) -> Result<Penalized> {
        self.penalize_with(scores, exposures, None)
    }

    /// Adjust `scores`, reusing `warm_start` weights when given.
    ///
    /// Warm-start weights skip fitting entirely. They must have one finite
    /// entry per exposure column; the resulting exposures are measured and a
    /// warning is logged if any exceeds the cap.
    ///
    /// # Errors
    /// * [`ExposureError::InvalidParameter`] for an empty score vector
    /// * [`ExposureError::DimensionMismatch`] for mismatched shapes or weights
    /// * [`ExposureError::NonFinite`] for NaN or infinite inputs
    /// * [`ExposureError::Diverged`] if the loss becomes non-finite
    pub fn penalize_with(
        &self,
        scores: &Array1<f64>,
        exposures: &Array2<f64>,
        warm_start: Option<&Array1<f64>>,
    ) -> Result<Penalized> {
        let started = Instant::now();
        let (rows, k) = exposures.dim();
        if scores.is_empty() {
            return Err(ExposureError::InvalidParameter(
                "cannot penalize an empty score vector".to_string(),
            ));
        }
        if rows != scores.len() {
            return Err(ExposureError::DimensionMismatch {
                what: "exposure matrix rows",
                expected: scores.len(),
                actual: rows,
            });
        }
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(ExposureError::NonFinite("scores"));
        }

        if k == 0 {
            return Ok(Penalized {
                scores: scores.clone(),
                weights: Array1::zeros(0),
                report: PenaltyReport {
                    iterations: 0,
                    loss: 0.0,
                    stop: StopReason::NoExposure,
                    start_max_exposure: 0.0,
                    final_max_exposure: 0.0,
                    elapsed: started.elapsed(),
                },
            });
        }

        let prepared = if self.config.normalize {
            RankGaussianizer::new(GaussianizeConfig {
                gaussianize: self.config.gaussianize,
            })
            .transform(scores.view())?
        } else {
            scores.clone()
        };

        let geometry = ExposureGeometry::new(prepared.view(), exposures.view())?;
        let start_exposures = geometry.start_exposures();
        let cap = self.config.max_exposure;
        let targets = start_exposures.mapv(|e| e.clamp(-cap, cap));

        let (weights, iterations, stop) = match warm_start {
            Some(weights) => {
                check_weights(weights, k)?;
                (weights.clone(), 0, StopReason::WarmStart)
            }
            None => self.fit(&geometry, &targets, started)?,
        };

        let LossGradient { loss, .. } = geometry.loss_and_gradient(&weights, &targets);
        let final_exposures = geometry.exposures(&weights);
        let adjusted = apply_weights(&prepared, exposures, &weights)?;
        let report = PenaltyReport {
            iterations,
            loss,
            stop,
            start_max_exposure: max_abs(start_exposures.view()),
            final_max_exposure: max_abs(final_exposures.view()),
            elapsed: started.elapsed(),
        };

        match stop {
            StopReason::WarmStart if report.final_max_exposure > cap => warn!(
                final_max_exposure = report.final_max_exposure,
                max_exposure = cap,
                "warm-start weights leave exposure above the cap"
            ),
            StopReason::BudgetExhausted | StopReason::DeadlineElapsed => warn!(
                iterations,
                loss,
                %stop,
                "exposure penalization stopped early"
            ),
            _ => debug!(
                iterations,
                loss,
                %stop,
                start = report.start_max_exposure,
                end = report.final_max_exposure,
                "exposure penalization finished"
            ),
        }

        Ok(Penalized {
            scores: unit_interval(adjusted.view()),
            weights,
            report,
        })
    }

    fn fit(
        &self,
        geometry: &ExposureGeometry,
        targets: &Array1<f64>,
        started: Instant,
    ) -> Result<(Array1<f64>, usize, StopReason)> {
        let mut weights = Array1::<f64>::zeros(geometry.dim());
        let mut optimizer = Adamax::new(self.config.optimizer, geometry.dim());
        let mut iteration = 0;

        let stop = loop {
            let LossGradient { loss, gradient } = geometry.loss_and_gradient(&weights, targets);
            if !loss.is_finite() || gradient.iter().any(|g| !g.is_finite()) {
                return Err(ExposureError::Diverged { iteration, loss });
            }
            if loss < self.config.tolerance {
                break StopReason::Converged;
            }
            if iteration >= self.config.iteration_budget {
                break StopReason::BudgetExhausted;
            }
            let past_deadline = self.config.deadline.is_some_and(|deadline| {
                iteration % DEADLINE_POLL == 0 && started.elapsed() >= deadline
            });
            if past_deadline {
                break StopReason::DeadlineElapsed;
            }
            optimizer.step(&mut weights, &gradient);
            iteration += 1;
        };

        Ok((weights, iteration, stop))
    }
}

/// `scores − (exposures − 0.5)·weights`
///
/// # Errors
/// [`ExposureError::DimensionMismatch`] if the shapes do not line up.
pub fn apply_weights(
    scores: &Array1<f64>,
    exposures: &Array2<f64>,
    weights: &Array1<f64>,
) -> Result<Array1<f64>> {
    check_weights(weights, exposures.ncols())?;
    if exposures.nrows() != scores.len() {
        return Err(ExposureError::DimensionMismatch {
            what: "exposure matrix rows",
            expected: scores.len(),
            actual: exposures.nrows(),
        });
    }
    let correction = (exposures - 0.5).dot(weights);
    Ok(scores - &correction)
}

fn check_weights(weights: &Array1<f64>, k: usize) -> Result<()> {
    if weights.len() != k {
        return Err(ExposureError::DimensionMismatch {
            what: "weights",
            expected: k,
            actual: weights.len(),
        });
    }
    if weights.iter().any(|w| !w.is_finite()) {
        return Err(ExposureError::NonFinite("weights"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::feature_exposures;
    use approx::assert_abs_diff_eq;
    use ndarray::{Axis, array};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    fn panel(rows: usize, cols: usize, seed: u64) -> (Array1<f64>, Array2<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let exposures = Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0.0..1.0));
        let scores = exposures
            .sum_axis(Axis(1))
            .mapv(|v| v + rng.gen_range(-0.5..0.5));
        (scores, exposures)
    }

    #[rstest]
    #[case(-0.01)]
    #[case(1.01)]
    fn test_rejects_bad_cap(#[case] max_exposure: f64) {
        let err = ExposurePenalizer::new(PenaltyConfig::with_max_exposure(max_exposure)).unwrap_err();
        assert!(matches!(err, ExposureError::InvalidParameter(_)));
    }

    #[test]
    fn test_caps_exposure() {
        let (scores, exposures) = panel(120, 4, 9);
        let penalizer = ExposurePenalizer::new(PenaltyConfig::with_max_exposure(0.1)).unwrap();
        let out = penalizer.penalize(&scores, &exposures).unwrap();

        assert_eq!(out.report.stop, StopReason::Converged);
        assert!(out.report.start_max_exposure > 0.1);
        assert!(out.report.final_max_exposure <= 0.1 + 1e-3);

        let measured = feature_exposures(out.scores.view(), exposures.view()).unwrap();
        for e in measured {
            assert!(e.abs() <= 0.1 + 1e-3, "exposure {e}");
        }
        assert!(out.scores.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_budget_exhaustion_is_reported() {
        let (scores, exposures) = panel(80, 3, 2);
        let config = PenaltyConfig {
            iteration_budget: 5,
            ..PenaltyConfig::default()
        };
        let out = ExposurePenalizer::new(config)
            .unwrap()
            .penalize(&scores, &exposures)
            .unwrap();
        assert_eq!(out.report.stop, StopReason::BudgetExhausted);
        assert_eq!(out.report.iterations, 5);
        assert!(!out.report.stop.is_complete());
    }

    #[test]
    fn test_zero_deadline_stops_immediately() {
        let (scores, exposures) = panel(80, 3, 4);
        let config = PenaltyConfig {
            deadline: Some(Duration::ZERO),
            ..PenaltyConfig::default()
        };
        let out = ExposurePenalizer::new(config)
            .unwrap()
            .penalize(&scores, &exposures)
            .unwrap();
        assert_eq!(out.report.stop, StopReason::DeadlineElapsed);
        assert_eq!(out.report.iterations, 0);
    }

    #[test]
    fn test_warm_start_reproduces_fit() {
        let (scores, exposures) = panel(100, 5, 17);
        let penalizer = ExposurePenalizer::new(PenaltyConfig::default()).unwrap();
        let fitted = penalizer.penalize(&scores, &exposures).unwrap();
        let reused = penalizer
            .penalize_with(&scores, &exposures, Some(&fitted.weights))
            .unwrap();

        assert_eq!(reused.report.stop, StopReason::WarmStart);
        assert_eq!(reused.report.iterations, 0);
        for (a, b) in fitted.scores.iter().zip(&reused.scores) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_warm_start_validation() {
        let (scores, exposures) = panel(20, 3, 1);
        let penalizer = ExposurePenalizer::new(PenaltyConfig::default()).unwrap();
        let err = penalizer
            .penalize_with(&scores, &exposures, Some(&array![0.1, 0.2]))
            .unwrap_err();
        assert!(matches!(
            err,
            ExposureError::DimensionMismatch { what: "weights", expected: 3, actual: 2 }
        ));
        let err = penalizer
            .penalize_with(&scores, &exposures, Some(&array![0.1, f64::NAN, 0.0]))
            .unwrap_err();
        assert!(matches!(err, ExposureError::NonFinite("weights")));
    }

    #[test]
    fn test_normalize_toggle_controls_rank_transform() {
        let (scores, exposures) = panel(80, 3, 21);
        let quick = PenaltyConfig {
            iteration_budget: 10,
            ..PenaltyConfig::default()
        };

        let raw = ExposurePenalizer::new(PenaltyConfig {
            normalize: false,
            ..quick
        })
        .unwrap()
        .penalize(&scores, &exposures)
        .unwrap();
        let direct = feature_exposures(scores.view(), exposures.view()).unwrap();
        assert_abs_diff_eq!(
            raw.report.start_max_exposure,
            max_abs(direct.view()),
            epsilon = 1e-9
        );

        let ranked = ExposurePenalizer::new(quick)
            .unwrap()
            .penalize(&scores, &exposures)
            .unwrap();
        let gaussianized = RankGaussianizer::new(GaussianizeConfig::default())
            .transform(scores.view())
            .unwrap();
        let direct = feature_exposures(gaussianized.view(), exposures.view()).unwrap();
        assert_abs_diff_eq!(
            ranked.report.start_max_exposure,
            max_abs(direct.view()),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_no_exposure_columns_pass_through() {
        let scores = array![3.0, 1.0, 2.0];
        let out = ExposurePenalizer::new(PenaltyConfig::default())
            .unwrap()
            .penalize(&scores, &Array2::zeros((3, 0)))
            .unwrap();
        assert_eq!(out.scores, scores);
        assert_eq!(out.report.stop, StopReason::NoExposure);
    }

    #[test]
    fn test_single_row() {
        let out = ExposurePenalizer::new(PenaltyConfig::default())
            .unwrap()
            .penalize(&array![0.3], &array![[0.1, 0.9]])
            .unwrap();
        assert_eq!(out.scores, array![0.5]);
        assert_eq!(out.report.stop, StopReason::Converged);
    }

    #[test]
    fn test_empty_scores_rejected() {
        let err = ExposurePenalizer::new(PenaltyConfig::default())
            .unwrap()
            .penalize(&Array1::zeros(0), &Array2::zeros((0, 2)))
            .unwrap_err();
        assert!(matches!(err, ExposureError::InvalidParameter(_)));
    }

    #[test]
    fn test_apply_weights() {
        let scores = array![1.0, 2.0];
        let exposures = array![[0.5, 1.0], [0.0, 0.5]];
        let out = apply_weights(&scores, &exposures, &array![2.0, 4.0]).unwrap();
        assert_eq!(out, array![-1.0, 3.0]);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: PenaltyConfig =
            serde_json::from_str(r#"{"max_exposure": 0.2, "iteration_budget": 500}"#).unwrap();
        assert_eq!(config.max_exposure, 0.2);
        assert_eq!(config.iteration_budget, 500);
        assert_eq!(config.tolerance, 1e-7);
        assert!(config.gaussianize);
        assert!(config.deadline.is_none());
    }
}

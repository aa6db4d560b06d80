//! Feature exposure
//!
//! The exposure of a score vector to a feature is the cosine similarity of
//! the two after mean-centering, i.e. their Pearson correlation.
//!
//! [`ExposureGeometry`] holds the sufficient statistics the penalizer needs
//! to evaluate exposures of `scores − (features − 0.5)·w` for any `w`
//! without touching the row data again. Centering removes the constant
//! `0.5` shift, so only the centered Gram matrix, the centered
//! feature-score products and the centered score energy are kept.

use crate::error::{ExposureError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Column norms at or below this are treated as constant features.
const DEGENERATE_NORM: f64 = 1e-10;

/// Pearson correlation of `scores` with every column of `features`.
///
/// Constant columns, and constant scores, have zero exposure.
///
/// # Errors
/// * [`ExposureError::DimensionMismatch`] if row counts differ
/// * [`ExposureError::NonFinite`] for NaN or infinite inputs
pub fn feature_exposures(
    scores: ArrayView1<'_, f64>,
    features: ArrayView2<'_, f64>,
) -> Result<Array1<f64>> {
    ExposureGeometry::new(scores, features).map(|geometry| geometry.start_exposures())
}

/// Largest absolute value, zero for an empty vector.
pub fn max_abs(values: ArrayView1<'_, f64>) -> f64 {
    values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

/// Sufficient statistics of one era's centered scores and features
#[derive(Debug, Clone)]
pub(crate) struct ExposureGeometry {
    /// Centered feature Gram matrix `X̃ᵀX̃` (k × k)
    gram: Array2<f64>,
    /// Centered feature-score products `X̃ᵀs̃`
    cross: Array1<f64>,
    /// Centered score energy `s̃·s̃`
    score_energy: f64,
    /// Centered feature column norms
    norms: Array1<f64>,
}

/// Loss and gradient at one weight vector
#[derive(Debug, Clone)]
pub(crate) struct LossGradient {
    pub loss: f64,
    pub gradient: Array1<f64>,
}

impl ExposureGeometry {
    pub(crate) fn new(scores: ArrayView1<'_, f64>, features: ArrayView2<'_, f64>) -> Result<Self> {
        let (rows, _) = features.dim();
        if scores.len() != rows {
            return Err(ExposureError::DimensionMismatch {
                what: "score vector",
                expected: rows,
                actual: scores.len(),
            });
        }
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(ExposureError::NonFinite("scores"));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(ExposureError::NonFinite("exposures"));
        }

        let centered_features = match features.mean_axis(Axis(0)) {
            Some(means) => &features - &means.insert_axis(Axis(0)),
            None => features.to_owned(),
        };
        let score_mean = if rows == 0 { 0.0 } else { scores.sum() / rows as f64 };
        let centered_scores = scores.mapv(|v| v - score_mean);

        let gram = centered_features.t().dot(&centered_features);
        let cross = centered_features.t().dot(&centered_scores);
        let score_energy = centered_scores.dot(&centered_scores);
        let norms = gram.diag().mapv(f64::sqrt);

        Ok(Self {
            gram,
            cross,
            score_energy,
            norms,
        })
    }

    /// Number of features.
    pub(crate) fn dim(&self) -> usize {
        self.norms.len()
    }

    /// Exposures of the unadjusted scores.
    pub(crate) fn start_exposures(&self) -> Array1<f64> {
        self.exposures(&Array1::zeros(self.dim()))
    }

    /// Exposures of `scores − (features − 0.5)·weights`.
    pub(crate) fn exposures(&self, weights: &Array1<f64>) -> Array1<f64> {
        let state = self.state(weights);
        state.exposures
    }

    /// Hinge loss against `targets` and its gradient with respect to `weights`.
    ///
    /// Per feature the loss is
    /// `relu(relu(e) − relu(t)) + relu(relu(−e) − relu(−t))`, which is zero
    /// while the exposure stays on the same side of zero as its target and
    /// no further from zero.
    pub(crate) fn loss_and_gradient(
        &self,
        weights: &Array1<f64>,
        targets: &Array1<f64>,
    ) -> LossGradient {
        let state = self.state(weights);

        let mut loss = 0.0;
        let mut signs = Array1::<f64>::zeros(self.dim());
        for ((sign, &e), &t) in signs.iter_mut().zip(&state.exposures).zip(targets) {
            let over = relu(relu(e) - relu(t));
            let under = relu(relu(-e) - relu(-t));
            loss += over + under;
            if over > 0.0 {
                *sign = 1.0;
            } else if under > 0.0 {
                *sign = -1.0;
            }
        }

        if loss == 0.0 || state.residual_norm <= DEGENERATE_NORM {
            return LossGradient {
                loss,
                gradient: Array1::zeros(self.dim()),
            };
        }

        // dL/de_j = sign_j, chained through e_j = numer_j / (d_j · ‖y‖)
        let scaled: Array1<f64> = signs
            .iter()
            .zip(&self.norms)
            .map(|(&sign, &norm)| if norm > DEGENERATE_NORM { sign / norm } else { 0.0 })
            .collect();
        let alignment = signs.dot(&state.exposures);
        let ny = state.residual_norm;
        let gradient = -(self.gram.dot(&scaled) - &state.numer * (alignment / ny)) / ny;

        LossGradient { loss, gradient }
    }

    fn state(&self, weights: &Array1<f64>) -> GeometryState {
        let gw = self.gram.dot(weights);
        let numer = &self.cross - &gw;
        let residual_energy = self.score_energy - 2.0 * weights.dot(&self.cross) + weights.dot(&gw);
        let residual_norm = residual_energy.max(0.0).sqrt();

        let exposures = if residual_norm <= DEGENERATE_NORM {
            Array1::zeros(self.dim())
        } else {
            numer
                .iter()
                .zip(&self.norms)
                .map(|(&n, &norm)| {
                    if norm > DEGENERATE_NORM {
                        n / (norm * residual_norm)
                    } else {
                        0.0
                    }
                })
                .collect()
        };

        GeometryState {
            numer,
            residual_norm,
            exposures,
        }
    }
}

struct GeometryState {
    numer: Array1<f64>,
    residual_norm: f64,
    exposures: Array1<f64>,
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

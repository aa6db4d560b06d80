//! Adamax optimizer
//!
//! Infinity-norm variant of Adam. The first moment is bias-corrected; the
//! exponentially weighted infinity norm needs no correction.

use crate::error::{ExposureError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Adamax hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamaxConfig {
    /// Step size (default: 0.001)
    pub learning_rate: f64,
    /// First moment decay (default: 0.9)
    pub beta1: f64,
    /// Infinity norm decay (default: 0.999)
    pub beta2: f64,
    /// Denominator offset (default: 1e-7)
    pub epsilon: f64,
}

impl Default for AdamaxConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

impl AdamaxConfig {
    /// Check hyperparameter ranges.
    ///
    /// # Errors
    /// [`ExposureError::InvalidParameter`] if the learning rate or epsilon is
    /// not positive, or a decay rate lies outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ExposureError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(ExposureError::InvalidParameter(format!(
                    "{name} must lie in [0, 1), got {beta}"
                )));
            }
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(ExposureError::InvalidParameter(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Adamax state for one weight vector
#[derive(Debug, Clone)]
pub struct Adamax {
    config: AdamaxConfig,
    moment: Array1<f64>,
    norm: Array1<f64>,
    beta1_power: f64,
    steps: usize,
}

impl Adamax {
    /// Fresh optimizer state for `dim` weights.
    pub fn new(config: AdamaxConfig, dim: usize) -> Self {
        Self {
            config,
            moment: Array1::zeros(dim),
            norm: Array1::zeros(dim),
            beta1_power: 1.0,
            steps: 0,
        }
    }

    /// Number of updates applied so far.
    pub const fn steps(&self) -> usize {
        self.steps
    }

    /// Apply one descent step to `weights` in place.
    pub fn step(&mut self, weights: &mut Array1<f64>, gradient: &Array1<f64>) {
        let AdamaxConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.config;

        self.steps += 1;
        self.beta1_power *= beta1;
        let step_size = learning_rate / (1.0 - self.beta1_power);

        ndarray::Zip::from(weights)
            .and(&mut self.moment)
            .and(&mut self.norm)
            .and(gradient)
            .for_each(|w, m, u, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *u = (beta2 * *u).max(g.abs());
                *w -= step_size * *m / (*u + epsilon);
            });
    }
}

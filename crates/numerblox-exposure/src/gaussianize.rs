//! Rank gaussianization
//!
//! Maps a score vector to `Φ⁻¹((rank − 0.5) / n)` where `rank` is the
//! ordinal rank of each value. Ties are broken by position, never by value,
//! so identical inputs always produce identical outputs.

use crate::error::{ExposureError, Result};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc_inv;
use std::f64::consts::SQRT_2;

/// Configuration for the rank transform
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GaussianizeConfig {
    /// Apply the inverse normal CDF after ranking (default: true).
    /// When false the output is the uniform `(rank − 0.5) / n`.
    pub gaussianize: bool,
}

impl Default for GaussianizeConfig {
    fn default() -> Self {
        Self { gaussianize: true }
    }
}

/// Rank-based normalizer
#[derive(Debug, Clone, Copy, Default)]
pub struct RankGaussianizer {
    config: GaussianizeConfig,
}

impl RankGaussianizer {
    /// Create a new rank transform.
    pub const fn new(config: GaussianizeConfig) -> Self {
        Self { config }
    }

    /// Transform `scores` into ranks mapped through the inverse normal CDF.
    ///
    /// # Errors
    /// * [`ExposureError::InvalidParameter`] for an empty vector
    /// * [`ExposureError::NonFinite`] for NaN or infinite scores
    pub fn transform(&self, scores: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        let n = scores.len();
        if n == 0 {
            return Err(ExposureError::InvalidParameter(
                "cannot rank an empty score vector".to_string(),
            ));
        }
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(ExposureError::NonFinite("scores"));
        }

        let ranks = ordinal_ranks(scores);
        let n = n as f64;
        Ok(ranks.mapv(|rank| {
            let quantile = (rank as f64 - 0.5) / n;
            if self.config.gaussianize {
                inverse_normal_cdf(quantile)
            } else {
                quantile
            }
        }))
    }
}

/// 1-based ordinal ranks; equal values are ranked in order of appearance.
pub fn ordinal_ranks(values: ArrayView1<'_, f64>) -> Array1<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // Stable sort keeps positional order among ties
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = Array1::<usize>::zeros(values.len());
    for (rank, &index) in order.iter().enumerate() {
        ranks[index] = rank + 1;
    }
    ranks
}

/// Standard normal quantile function.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

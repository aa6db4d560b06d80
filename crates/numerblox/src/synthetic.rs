//! Seeded synthetic panels
//!
//! Generates a tournament-shaped dataset: an integer `era` column, feature
//! columns uniform on `[0, 1]`, a `target` column and a `prediction` that is
//! a noisy linear combination of the first few features. Rows of different
//! eras are interleaved.

use numerblox_data::{DataError, Dataset};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shape and seed of a synthetic panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticPanel {
    /// Number of eras (default: 3)
    pub eras: usize,
    /// Rows in each era (default: 100)
    pub rows_per_era: usize,
    /// Number of feature columns (default: 10)
    pub features: usize,
    /// Features the prediction leans on (default: 3)
    pub signal_features: usize,
    /// Half-width of the uniform noise added to the prediction (default: 0.5)
    pub noise: f64,
    /// RNG seed (default: 42)
    pub seed: u64,
}

impl Default for SyntheticPanel {
    fn default() -> Self {
        Self {
            eras: 3,
            rows_per_era: 100,
            features: 10,
            signal_features: 3,
            noise: 0.5,
            seed: 42,
        }
    }
}

impl SyntheticPanel {
    /// Total number of rows.
    pub const fn rows(&self) -> usize {
        self.eras * self.rows_per_era
    }

    /// Feature column names, `feature_00`, `feature_01`, ...
    pub fn feature_names(&self) -> Vec<String> {
        (0..self.features).map(|j| format!("feature_{j:02}")).collect()
    }

    /// Generate the dataset.
    ///
    /// # Errors
    /// [`DataError::InvalidParameter`] for zero eras, zero rows per era or a
    /// negative noise level.
    pub fn build(&self) -> Result<Dataset, DataError> {
        if self.eras == 0 || self.rows_per_era == 0 {
            return Err(DataError::InvalidParameter(
                "synthetic panel needs at least one era and one row per era".to_string(),
            ));
        }
        if !(self.noise >= 0.0 && self.noise.is_finite()) {
            return Err(DataError::InvalidParameter(format!(
                "noise must be finite and non-negative, got {}",
                self.noise
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let n = self.rows();
        let eras: Vec<i64> = (0..n).map(|i| (i % self.eras) as i64 + 1).collect();
        let features: Vec<Vec<f64>> = (0..self.features)
            .map(|_| (0..n).map(|_| rng.gen_range(0.0..1.0)).collect())
            .collect();

        let signal = self.signal_features.min(self.features);
        let mut prediction = Vec::with_capacity(n);
        let mut target = Vec::with_capacity(n);
        for i in 0..n {
            let base: f64 = features.iter().take(signal).map(|column| column[i]).sum();
            let jitter = if self.noise > 0.0 {
                rng.gen_range(-self.noise..self.noise)
            } else {
                0.0
            };
            prediction.push(base + jitter);
            target.push(f64::from(u8::from(rng.gen_bool(0.5))) * 0.5 + 0.25);
        }

        let mut columns = Vec::with_capacity(self.features + 3);
        columns.push(Column::new("era".into(), eras));
        for (name, values) in self.feature_names().into_iter().zip(features) {
            columns.push(Column::new(name.into(), values));
        }
        columns.push(Column::new("target".into(), target));
        columns.push(Column::new("prediction".into(), prediction));

        Dataset::new(DataFrame::new(columns)?)
    }
}

//! Orthogonal neutralization
//!
//! Removes a proportion of the least-squares projection of the scores onto
//! the exposure columns:
//!
//! `neutral = scores − proportion × E · pinv(E) · scores`
//!
//! followed by division by the sample standard deviation.

use crate::error::{ExposureError, Result};
use crate::linalg::{PseudoInverseConfig, project};
use crate::scale::unit_std;
use ndarray::{Array1, Array2};

/// Closed-form feature neutralizer for one era
#[derive(Debug, Clone, Copy)]
pub struct OrthogonalNeutralizer {
    proportion: f64,
    pinv: PseudoInverseConfig,
}

impl OrthogonalNeutralizer {
    /// Create a neutralizer removing `proportion` of the linear exposure.
    ///
    /// # Errors
    /// [`ExposureError::InvalidParameter`] unless `proportion ∈ [0, 1]`.
    pub fn new(proportion: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&proportion) {
            return Err(ExposureError::InvalidParameter(format!(
                "proportion must lie in [0, 1], got {proportion}"
            )));
        }
        Ok(Self {
            proportion,
            pinv: PseudoInverseConfig::default(),
        })
    }

    /// Override the pseudo-inverse settings.
    pub const fn with_pseudo_inverse(mut self, pinv: PseudoInverseConfig) -> Self {
        self.pinv = pinv;
        self
    }

    /// Proportion of exposure removed.
    pub const fn proportion(&self) -> f64 {
        self.proportion
    }

    /// Neutralize `scores` against the columns of `exposures`.
    ///
    /// # Errors
    /// * [`ExposureError::DimensionMismatch`] if row counts differ
    /// * [`ExposureError::NonFinite`] for NaN or infinite inputs
    /// * [`ExposureError::NonConvergence`] if the pseudo-inverse fails
    pub fn neutralize(&self, scores: &Array1<f64>, exposures: &Array2<f64>) -> Result<Array1<f64>> {
        if exposures.nrows() != scores.len() {
            return Err(ExposureError::DimensionMismatch {
                what: "exposure matrix rows",
                expected: scores.len(),
                actual: exposures.nrows(),
            });
        }
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(ExposureError::NonFinite("scores"));
        }
        if exposures.iter().any(|v| !v.is_finite()) {
            return Err(ExposureError::NonFinite("exposures"));
        }

        let adjusted = if self.proportion == 0.0 {
            scores.clone()
        } else {
            let projection = project(exposures, scores, &self.pinv)?;
            scores - &(projection * self.proportion)
        };
        Ok(unit_std(adjusted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::feature_exposures;
    use crate::gaussianize::ordinal_ranks;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    fn panel(rows: usize, cols: usize, seed: u64) -> (Array1<f64>, Array2<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let exposures = Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0.0..1.0));
        let scores = exposures.sum_axis(ndarray::Axis(1)).mapv(|v| v + rng.gen_range(-1.0..1.0));
        (scores, exposures)
    }

    #[rstest]
    #[case(-0.1)]
    #[case(1.5)]
    #[case(f64::NAN)]
    fn test_rejects_proportion_out_of_range(#[case] proportion: f64) {
        assert!(matches!(
            OrthogonalNeutralizer::new(proportion),
            Err(ExposureError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_proportion_preserves_rank_order() {
        let (scores, exposures) = panel(80, 4, 1);
        let out = OrthogonalNeutralizer::new(0.0)
            .unwrap()
            .neutralize(&scores, &exposures)
            .unwrap();
        assert_eq!(ordinal_ranks(out.view()), ordinal_ranks(scores.view()));
    }

    #[rstest]
    #[case(100, 5, 7)]
    #[case(30, 10, 13)]
    fn test_full_proportion_removes_correlation(
        #[case] rows: usize,
        #[case] cols: usize,
        #[case] seed: u64,
    ) {
        let (scores, exposures) = panel(rows, cols, seed);
        // Intercept column so projection also removes the mean
        let mut with_const = Array2::<f64>::ones((rows, cols + 1));
        with_const.slice_mut(ndarray::s![.., ..cols]).assign(&exposures);

        let out = OrthogonalNeutralizer::new(1.0)
            .unwrap()
            .neutralize(&scores, &with_const)
            .unwrap();
        let residual = feature_exposures(out.view(), exposures.view()).unwrap();
        for r in residual {
            assert_abs_diff_eq!(r, 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_output_has_unit_std() {
        let (scores, exposures) = panel(50, 3, 21);
        let out = OrthogonalNeutralizer::new(0.5)
            .unwrap()
            .neutralize(&scores, &exposures)
            .unwrap();
        let mean = out.sum() / 50.0;
        let var = out.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 49.0;
        assert_abs_diff_eq!(var.sqrt(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_single_row_does_not_raise() {
        let out = OrthogonalNeutralizer::new(1.0)
            .unwrap()
            .neutralize(&array![0.7], &array![[0.2, 0.9, 0.4]])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_finite());
    }

    #[test]
    fn test_zero_columns_only_rescales() {
        let scores = array![1.0, 3.0, 5.0];
        let out = OrthogonalNeutralizer::new(1.0)
            .unwrap()
            .neutralize(&scores, &Array2::zeros((3, 0)))
            .unwrap();
        assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_finite() {
        let neutralizer = OrthogonalNeutralizer::new(0.5).unwrap();
        let err = neutralizer
            .neutralize(&array![1.0, f64::INFINITY], &array![[0.1], [0.2]])
            .unwrap_err();
        assert!(matches!(err, ExposureError::NonFinite("scores")));
        let err = neutralizer
            .neutralize(&array![1.0, 2.0], &array![[0.1], [f64::NAN]])
            .unwrap_err();
        assert!(matches!(err, ExposureError::NonFinite("exposures")));
    }
}

//! Scaling helpers shared by the neutralizer and the penalizer.

use ndarray::{Array1, ArrayView1};

/// Spreads at or below this are treated as zero.
pub(crate) const DEGENERATE_SPREAD: f64 = 1e-12;

/// Standard deviation with `ddof` delta degrees of freedom.
///
/// Returns `None` when there are not more than `ddof` values.
pub fn std_dev(values: ArrayView1<'_, f64>, ddof: usize) -> Option<f64> {
    let n = values.len();
    if n <= ddof {
        return None;
    }
    let mean = values.sum() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / (n - ddof) as f64).sqrt())
}

/// Divide by the sample standard deviation (`ddof = 1`).
///
/// Vectors with fewer than two values or zero spread are returned as-is.
pub fn unit_std(values: Array1<f64>) -> Array1<f64> {
    match std_dev(values.view(), 1) {
        Some(std) if std.is_finite() && std > DEGENERATE_SPREAD => values / std,
        _ => values,
    }
}

/// Min-max scale into `[0, 1]`.
///
/// Dividing by the standard deviation before shifting and scaling gives the
/// same result, so it is skipped. Constant vectors map to 0.5.
pub fn unit_interval(values: ArrayView1<'_, f64>) -> Array1<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let spread = max - min;
    if !spread.is_finite() || spread <= DEGENERATE_SPREAD * max.abs().max(1.0) {
        return Array1::from_elem(values.len(), 0.5);
    }
    values.mapv(|v| ((v - min) / spread).clamp(0.0, 1.0))
}

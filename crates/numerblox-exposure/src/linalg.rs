//! Linear algebra helpers
//!
//! Symmetric eigendecomposition (cyclic Jacobi) and the Moore–Penrose
//! pseudo-inverse built on top of it. Exposure matrices are rarely square
//! and often rank-deficient, so projections go through the pseudo-inverse
//! rather than a direct inverse.

use crate::error::{ExposureError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Result of eigenvalue decomposition
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues (sorted in descending order)
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors (columns are eigenvectors)
    pub eigenvectors: Array2<f64>,
}

/// Configuration for [`pseudo_inverse`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PseudoInverseConfig {
    /// Maximum number of Jacobi sweeps (default: 64)
    pub max_sweeps: usize,
    /// Off-diagonal tolerance relative to the Frobenius norm (default: 1e-12)
    pub tolerance: f64,
    /// Singular values below `rcond * max singular value` are treated as zero.
    /// `None` picks a cutoff from the matrix size and machine precision.
    pub rcond: Option<f64>,
}

impl Default for PseudoInverseConfig {
    fn default() -> Self {
        Self {
            max_sweeps: 64,
            tolerance: 1e-12,
            rcond: None,
        }
    }
}

/// Jacobi eigenvalue decomposition for symmetric matrices
///
/// Cyclic sweeps over all off-diagonal pairs until the off-diagonal mass
/// drops below `tolerance` times the Frobenius norm.
///
/// # Arguments
/// * `matrix` - Symmetric matrix to decompose
/// * `max_sweeps` - Maximum number of full sweeps
/// * `tolerance` - Relative convergence tolerance for off-diagonal elements
///
/// # Errors
/// * [`ExposureError::NonFinite`] for NaN or infinite entries
/// * [`ExposureError::NonConvergence`] if the sweep budget runs out
pub fn jacobi_eigendecomp(
    matrix: &Array2<f64>,
    max_sweeps: usize,
    tolerance: f64,
) -> Result<EigenDecomposition> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(ExposureError::DimensionMismatch {
            what: "symmetric matrix",
            expected: n,
            actual: matrix.ncols(),
        });
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(ExposureError::NonFinite("eigendecomposition input"));
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt();

    let mut converged = scale == 0.0;
    let mut sweeps = 0;
    while !converged && sweeps < max_sweeps {
        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]] != 0.0 {
                    let (cos_theta, sin_theta) = compute_rotation(a[[p, p]], a[[q, q]], a[[p, q]]);
                    apply_jacobi_rotation(&mut a, &mut v, p, q, cos_theta, sin_theta);
                }
            }
        }
        sweeps += 1;
        converged = off_diagonal_norm(&a) <= tolerance * scale;
    }
    if !converged {
        return Err(ExposureError::NonConvergence { sweeps });
    }

    let eigenvalues: Array1<f64> = a.diag().to_owned();

    // Sort eigenvalues and eigenvectors in descending order
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| eigenvalues[j].total_cmp(&eigenvalues[i]));

    let sorted_eigenvalues = indices.iter().map(|&i| eigenvalues[i]).collect();
    let sorted_eigenvectors = v.select(Axis(1), &indices);

    Ok(EigenDecomposition {
        eigenvalues: sorted_eigenvalues,
        eigenvectors: sorted_eigenvectors,
    })
}

fn off_diagonal_norm(matrix: &Array2<f64>) -> f64 {
    matrix
        .indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, x)| x * x)
        .sum::<f64>()
        .sqrt()
}

/// Compute the rotation (cos, sin) that zeroes `a[p][q]`
fn compute_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };

    let cos_theta = 1.0 / (1.0 + t * t).sqrt();
    let sin_theta = t * cos_theta;

    (cos_theta, sin_theta)
}

/// Apply a Jacobi rotation to matrix A and eigenvector matrix V
fn apply_jacobi_rotation(
    a: &mut Array2<f64>,
    v: &mut Array2<f64>,
    p: usize,
    q: usize,
    cos_theta: f64,
    sin_theta: f64,
) {
    let n = a.nrows();

    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let apq = a[[p, q]];

    a[[p, p]] = cos_theta * cos_theta * app - 2.0 * cos_theta * sin_theta * apq
        + sin_theta * sin_theta * aqq;
    a[[q, q]] = sin_theta * sin_theta * app
        + 2.0 * cos_theta * sin_theta * apq
        + cos_theta * cos_theta * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in 0..n {
        if i != p && i != q {
            let aip = a[[i, p]];
            let aiq = a[[i, q]];

            a[[i, p]] = cos_theta * aip - sin_theta * aiq;
            a[[p, i]] = a[[i, p]];

            a[[i, q]] = sin_theta * aip + cos_theta * aiq;
            a[[q, i]] = a[[i, q]];
        }
    }

    for i in 0..n {
        let vip = v[[i, p]];
        let viq = v[[i, q]];

        v[[i, p]] = cos_theta * vip - sin_theta * viq;
        v[[i, q]] = sin_theta * vip + cos_theta * viq;
    }
}

/// Moore–Penrose pseudo-inverse
///
/// Decomposes the smaller of the two Gram matrices (`AᵀA` or `AAᵀ`), whose
/// eigenvalues are the squared singular values of `A`, and inverts only the
/// eigenvalues above the rank cutoff:
///
/// * rows ≥ columns: `A⁺ = V Λ⁻¹ Vᵀ Aᵀ`
/// * rows < columns: `A⁺ = Aᵀ U Λ⁻¹ Uᵀ`
///
/// # Returns
/// * Matrix of shape (columns × rows)
pub fn pseudo_inverse(matrix: &Array2<f64>, config: &PseudoInverseConfig) -> Result<Array2<f64>> {
    let (rows, cols) = matrix.dim();
    if rows == 0 || cols == 0 {
        return Ok(Array2::zeros((cols, rows)));
    }

    let tall = rows >= cols;
    let gram = if tall {
        matrix.t().dot(matrix)
    } else {
        matrix.dot(&matrix.t())
    };
    let decomp = jacobi_eigendecomp(&gram, config.max_sweeps, config.tolerance)?;

    let lambda_max = decomp.eigenvalues.iter().copied().fold(0.0, f64::max);
    let rel_cutoff = config.rcond.map_or_else(
        || (rows.max(cols) as f64 * f64::EPSILON).max(1e-12),
        |rcond| rcond * rcond,
    );
    let cutoff = lambda_max * rel_cutoff;

    let inverted = decomp
        .eigenvalues
        .mapv(|lambda| if lambda > cutoff && lambda > 0.0 { 1.0 / lambda } else { 0.0 });

    // Q Λ⁻¹ Qᵀ with Q the eigenvectors of the Gram matrix
    let scaled = &decomp.eigenvectors * &inverted.insert_axis(Axis(0));
    let gram_pinv = scaled.dot(&decomp.eigenvectors.t());

    Ok(if tall {
        gram_pinv.dot(&matrix.t())
    } else {
        matrix.t().dot(&gram_pinv)
    })
}

/// Least-squares projection of `target` onto the column space of `basis`
pub fn project(
    basis: &Array2<f64>,
    target: &Array1<f64>,
    config: &PseudoInverseConfig,
) -> Result<Array1<f64>> {
    if basis.nrows() != target.len() {
        return Err(ExposureError::DimensionMismatch {
            what: "projection target",
            expected: basis.nrows(),
            actual: target.len(),
        });
    }
    if basis.ncols() == 0 {
        return Ok(Array1::zeros(target.len()));
    }
    let pinv = pseudo_inverse(basis, config)?;
    Ok(basis.dot(&pinv.dot(target)))
}

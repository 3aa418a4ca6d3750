//! Linear least squares with optional per-coefficient ridge penalties

use crate::{MathError, Result};

/// Ordinary least squares fit
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// Estimated coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients
    pub std_errors: Vec<f64>,
    /// Residuals `y - X beta`
    pub residuals: Vec<f64>,
    /// Residual variance estimate with `n - k` degrees of freedom
    pub sigma2: f64,
}

/// Solve `(X'X + diag(penalties)) beta = X'y`.
///
/// `design` is row-major with one row per observation. `penalties` must
/// have one entry per column; zero means unpenalized.
pub fn ridge_solve(design: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    let (xtx, xty) = normal_equations(design, y)?;
    let k = xty.len();
    if penalties.len() != k {
        return Err(MathError::InvalidInput(format!(
            "Expected {} penalties, got {}",
            k,
            penalties.len()
        )));
    }

    let mut a = xtx;
    for (i, &lambda) in penalties.iter().enumerate() {
        // A tiny jitter keeps collinear seasonal columns solvable
        a[i][i] += lambda.max(0.0) + 1e-10;
    }
    solve(a, xty)
}

/// Ordinary least squares with coefficient standard errors.
pub fn least_squares(design: &[Vec<f64>], y: &[f64]) -> Result<LeastSquaresFit> {
    let (xtx, xty) = normal_equations(design, y)?;
    let n = design.len();
    let k = xty.len();
    if n <= k {
        return Err(MathError::InsufficientData(format!(
            "Least squares needs more than {} observations, got {}",
            k, n
        )));
    }

    let inverse = invert(xtx)?;
    let coefficients: Vec<f64> = inverse
        .iter()
        .map(|row| row.iter().zip(&xty).map(|(a, b)| a * b).sum())
        .collect();

    let residuals: Vec<f64> = design
        .iter()
        .zip(y)
        .map(|(row, &target)| target - dot(row, &coefficients))
        .collect();
    let sigma2 = residuals.iter().map(|r| r * r).sum::<f64>() / (n - k) as f64;
    let std_errors = (0..k)
        .map(|i| (sigma2 * inverse[i][i]).max(0.0).sqrt())
        .collect();

    Ok(LeastSquaresFit {
        coefficients,
        std_errors,
        residuals,
        sigma2,
    })
}

/// Dot product of two equal-length slices
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normal_equations(design: &[Vec<f64>], y: &[f64]) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
    if design.is_empty() {
        return Err(MathError::InsufficientData(
            "Design matrix has no rows".to_string(),
        ));
    }
    if design.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            design.len(),
            y.len()
        )));
    }

    let k = design[0].len();
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Design matrix has no columns".to_string(),
        ));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in design.iter().zip(y) {
        if row.len() != k {
            return Err(MathError::InvalidInput(
                "Design matrix rows have unequal lengths".to_string(),
            ));
        }
        for a in 0..k {
            let xa = row[a];
            if xa == 0.0 {
                continue;
            }
            xty[a] += xa * target;
            for b in a..k {
                xtx[a][b] += xa * row[b];
            }
        }
    }
    for a in 0..k {
        for b in 0..a {
            xtx[a][b] = xtx[b][a];
        }
    }
    Ok((xtx, xty))
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let k = b.len();
    for col in 0..k {
        let pivot_row = (col..k)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < 1e-14 {
            return Err(MathError::CalculationError(
                "Singular system in least squares".to_string(),
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..k {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..k {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; k];
    for row in (0..k).rev() {
        let tail: f64 = ((row + 1)..k).map(|c| a[row][c] * x[c]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

/// Gauss-Jordan inverse of a square matrix
fn invert(mut a: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>> {
    let k = a.len();
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot_row = (col..k)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < 1e-14 {
            return Err(MathError::CalculationError(
                "Singular matrix cannot be inverted".to_string(),
            ));
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for c in 0..k {
            a[col][c] /= pivot;
            inv[col][c] /= pivot;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..k {
                a[row][c] -= factor * a[col][c];
                inv[row][c] -= factor * inv[col][c];
            }
        }
    }
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_design(n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|i| vec![1.0, i as f64]).collect()
    }

    #[test]
    fn test_least_squares_recovers_line() {
        let design = line_design(20);
        let y: Vec<f64> = (0..20)
            .map(|i| 3.0 + 0.5 * i as f64 + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let fit = least_squares(&design, &y).unwrap();
        assert_relative_eq!(fit.coefficients[0], 3.0, epsilon = 0.1);
        assert_relative_eq!(fit.coefficients[1], 0.5, epsilon = 0.01);
        assert!(fit.std_errors.iter().all(|s| *s > 0.0));
        assert_eq!(fit.residuals.len(), 20);
    }

    #[test]
    fn test_ridge_penalty_shrinks_coefficient() {
        let design = line_design(30);
        let y: Vec<f64> = (0..30).map(|i| 2.0 * i as f64).collect();
        let free = ridge_solve(&design, &y, &[0.0, 0.0]).unwrap();
        let shrunk = ridge_solve(&design, &y, &[0.0, 1e6]).unwrap();
        assert_relative_eq!(free[1], 2.0, epsilon = 1e-6);
        assert!(shrunk[1].abs() < free[1].abs());
    }

    #[test]
    fn test_shape_errors() {
        assert!(least_squares(&[], &[]).is_err());
        assert!(least_squares(&line_design(3), &[1.0, 2.0]).is_err());
        assert!(ridge_solve(&line_design(5), &[1.0; 5], &[0.0]).is_err());
        // Two columns need at least three rows
        assert!(least_squares(&line_design(2), &[1.0, 2.0]).is_err());
    }
}

//! Differencing and lag-polynomial helpers

/// Apply `d` first differences.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply `d` seasonal differences at lag `period`.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            return Vec::new();
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Multiply two lag polynomials given as coefficient vectors (index = power of B).
pub fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Coefficients of `(1 - B)^d (1 - B^period)^seasonal_d`, leading 1 included.
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }
    poly
}

/// Undo differencing: extend `history` with the values implied by `future_diffs`.
///
/// `polynomial` is the output of [`differencing_polynomial`] for the same
/// orders used to produce the differenced series.
pub fn integrate(future_diffs: &[f64], history: &[f64], polynomial: &[f64]) -> Vec<f64> {
    let mut extended = history.to_vec();
    for &w in future_diffs {
        let t = extended.len();
        let mut value = w;
        for (i, &c) in polynomial.iter().enumerate().skip(1) {
            if t >= i {
                value -= c * extended[t - i];
            }
        }
        extended.push(value);
    }
    extended.split_off(history.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_difference_orders() {
        let series = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert_eq!(difference(&series, 0), series.to_vec());
        assert_eq!(difference(&series, 1), vec![3.0, 5.0, 7.0, 9.0]);
        assert_eq!(difference(&series, 2), vec![2.0, 2.0, 2.0]);
        assert!(difference(&[1.0], 1).is_empty());
    }

    #[test]
    fn test_seasonal_difference() {
        let series = [1.0, 2.0, 3.0, 11.0, 12.0, 13.0];
        assert_eq!(seasonal_difference(&series, 1, 3), vec![10.0, 10.0, 10.0]);
        assert!(seasonal_difference(&series, 2, 3).is_empty());
    }

    #[test]
    fn test_differencing_polynomial() {
        assert_eq!(differencing_polynomial(1, 0, 0), vec![1.0, -1.0]);
        assert_eq!(differencing_polynomial(2, 0, 0), vec![1.0, -2.0, 1.0]);
        assert_eq!(
            differencing_polynomial(1, 1, 3),
            vec![1.0, -1.0, 0.0, -1.0, 1.0]
        );
    }

    #[test]
    fn test_integrate_inverts_difference() {
        let series = [3.0, 5.0, 4.0, 8.0, 9.0, 12.0, 11.0, 15.0];
        let poly = differencing_polynomial(1, 1, 2);
        let diffs = seasonal_difference(&difference(&series, 1), 1, 2);

        // Rebuild the last three values from the first five plus their diffs
        let rebuilt = integrate(&diffs[diffs.len() - 3..], &series[..5], &poly);
        for (got, want) in rebuilt.iter().zip(&series[5..]) {
            assert_relative_eq!(got, want, epsilon = 1e-12);
        }
    }
}

//! Basic descriptive statistics.
//!
//! Variances and standard deviations are population statistics (dividing by `n`), which is what
//! both the standardisation and the objective function are defined in terms of.

/// The arithmetic mean of `values`, or `NaN` if empty
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// The population variance of `values`, or `NaN` if empty
pub fn variance(values: &[f64]) -> f64 {
    let mean = mean(values);
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// The population standard deviation of `values`, or `NaN` if empty
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_stats() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx_eq!(f64, mean(&values), 5.0);
        assert_approx_eq!(f64, variance(&values), 4.0);
        assert_approx_eq!(f64, std_dev(&values), 2.0);
    }

    #[test]
    fn test_stats_single_value() {
        assert_approx_eq!(f64, mean(&[3.0]), 3.0);
        assert_approx_eq!(f64, variance(&[3.0]), 0.0);
    }

    #[test]
    fn test_stats_empty() {
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[]).is_nan());
    }
}

use argminmax::ArgMinMax;
use statrs::statistics::{Data, OrderStatistics};

#[inline]
pub(crate) fn get_max(vec: &[f64]) -> f64 {
    let max_index: usize = vec.argmax();
    vec[max_index]
}

/// The `p`-th percentile (0..=100) of `values`. Empty input yields 0.0 so the
/// callers never see NaN from a degenerate distribution.
pub(crate) fn percentile_of(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut data = Data::new(values.to_vec());
    let pct = data.percentile(p.clamp(0.0, 100.0) as usize);
    if pct.is_nan() { 0.0 } else { pct }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_max() {
        assert_eq!(get_max(&[1.0, 9.0, 3.5]), 9.0);
    }

    #[test]
    fn test_percentile_bounds() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_eq!(percentile_of(&[], 70.0), 0.0);
        let p0 = percentile_of(&values, 0.0);
        let p100 = percentile_of(&values, 100.0);
        assert_eq!(p0, 1.0);
        assert_eq!(p100, 100.0);
        let p50 = percentile_of(&values, 50.0);
        assert!(p50 > 40.0 && p50 < 60.0);
    }
}

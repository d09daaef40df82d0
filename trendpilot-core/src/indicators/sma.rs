//! Simple moving average over a series with undefined entries.
//!
//! Output at index i is the mean of `values[i+1-period..=i]`. It is `None`
//! while fewer than `period` values exist, and whenever any value in the
//! window is undefined.

pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];

    if period == 0 || n < period {
        return result;
    }

    for (offset, window) in values.windows(period).enumerate() {
        let sum: Option<f64> = window.iter().copied().sum();
        result[offset + period - 1] = sum.map(|s| s / period as f64);
    }

    result
}

/// Percentile helpers for already-sorted slices.
///
/// The index for quantile `q` over `n` samples is `round(n * q) - 1`,
/// clamped to `[0, n - 1]`, so P50 over an odd count lands on the middle
/// sample and P10 over fewer than five samples is the first one.

pub fn percentile_index(len: usize, quantile: f64) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let raw = (len as f64 * quantile).round() as i64 - 1;
    Some(raw.clamp(0, len as i64 - 1) as usize)
}

/// Returns the percentile value from a slice that is already sorted in
/// ascending order.
pub fn value_sorted<T: Copy>(sorted_values: &[T], quantile: f64) -> Option<T> {
    let index = percentile_index(sorted_values.len(), quantile)?;
    sorted_values.get(index).copied()
}

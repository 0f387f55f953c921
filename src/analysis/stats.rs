use ordered_float::OrderedFloat;

/// Linearly interpolated percentile of the finite values in `values`.
///
/// `percent` is in `0..=100`. Rank `p/100 * (n - 1)` is interpolated between
/// its neighbouring order statistics. Returns `None` when no finite value exists.
pub(crate) fn percentile(values: impl IntoIterator<Item = f32>, percent: f64) -> Option<f32> {
    let mut finite: Vec<OrderedFloat<f32>> = values
        .into_iter()
        .filter(|value| value.is_finite())
        .map(OrderedFloat)
        .collect();
    if finite.is_empty() {
        return None;
    }
    let rank = (percent.clamp(0.0, 100.0) / 100.0) * (finite.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let fraction = rank - lower as f64;
    let (_, low, upper_part) = finite.select_nth_unstable(lower);
    let low = low.0 as f64;
    if fraction == 0.0 || upper_part.is_empty() {
        return Some(low as f32);
    }
    let high = upper_part.iter().min().map(|v| v.0 as f64).unwrap_or(low);
    Some((low + (high - low) * fraction) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_order_statistics() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(values, 0.0), Some(1.0));
        assert_eq!(percentile(values, 100.0), Some(4.0));
        assert_eq!(percentile(values, 50.0), Some(2.5));
        let p70 = percentile(values, 70.0).unwrap();
        assert!((p70 - 3.1).abs() < 1e-6);
    }

    #[test]
    fn ignores_non_finite_values() {
        let values = [f32::NAN, 5.0, f32::INFINITY, 7.0];
        assert_eq!(percentile(values, 50.0), Some(6.0));
    }

    #[test]
    fn empty_input_has_no_percentile() {
        assert_eq!(percentile(Vec::<f32>::new(), 50.0), None);
        assert_eq!(percentile([f32::NAN], 50.0), None);
    }

    #[test]
    fn single_value_is_every_percentile() {
        assert_eq!(percentile([-12.5], 0.0), Some(-12.5));
        assert_eq!(percentile([-12.5], 75.0), Some(-12.5));
    }
}

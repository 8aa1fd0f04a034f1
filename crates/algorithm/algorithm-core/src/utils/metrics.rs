//! Forecast accuracy metrics
//!
//! Both metrics return `NaN` when the slices differ in length or are empty.

/// Pairs of `(actual, predicted)`, or `None` when they cannot be compared
fn paired<'a>(
    actual: &'a [f64],
    predicted: &'a [f64],
) -> Option<impl Iterator<Item = (f64, f64)> + 'a> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    Some(actual.iter().copied().zip(predicted.iter().copied()))
}

/// Root mean squared error, on the scale of the data
///
/// ```rust
/// use algorithm_core::utils::metrics::rmse;
///
/// let error = rmse(&[0.0, 0.0], &[3.0, -3.0]);
/// assert!((error - 3.0).abs() < 1e-12);
/// ```
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let Some(pairs) = paired(actual, predicted) else {
        return f64::NAN;
    };
    let squared: f64 = pairs.map(|(a, p)| (a - p) * (a - p)).sum();
    (squared / actual.len() as f64).sqrt()
}

/// Mean absolute percentage error, in percent
///
/// Zero actuals have no relative error and are left out of the mean; if
/// nothing is left the result is `NaN`.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    let Some(pairs) = paired(actual, predicted) else {
        return f64::NAN;
    };
    let (total, count) = pairs
        .filter(|(a, _)| a.abs() > 1e-10)
        .fold((0.0, 0usize), |(total, count), (a, p)| {
            (total + ((a - p) / a).abs(), count + 1)
        });
    if count == 0 {
        f64::NAN
    } else {
        100.0 * total / count as f64
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance = values
        .iter()
        .map(|&x| {
            let diff = x - avg;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;

    Some(variance.sqrt())
}

/// Standard deviation divided by the mean.
///
/// Dimensionless, so a $10 stock and a $500 stock can be compared on the same
/// tightness scale. `None` when the slice is empty or the mean is zero.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    if avg == 0.0 {
        return None;
    }
    let std_dev = population_std_dev(values)?;
    Some(std_dev / avg)
}

/// Simple Moving Average (SMA)
/// Returns a vector aligned with `values`:
/// - `None` until enough values exist
/// - `Some(avg)` after `window` values
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    // Running sum; subtract the value that falls out of the window.
    values
        .iter()
        .enumerate()
        .scan(0.0_f64, move |sum, (i, &v)| {
            *sum += v;
            if i >= window {
                *sum -= values[i - window];
            }

            let out = if i + 1 >= window {
                Some(*sum / window as f64)
            } else {
                None
            };

            Some(out)
        })
        .collect()
}

/// Relative Strength Index (RSI)
///
/// Compares recent gains to recent losses on a 0-100 scale:
/// - Below 30: oversold
/// - Above 70: overbought
///
/// The first average is a plain mean over `period` changes, later values use
/// Wilder smoothing (alpha = 1 / period).
///
/// Returns `None` for the first `period` values, then `Some(rsi)`.
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return result;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = changes.iter().map(|&c| c.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|&c| (-c).max(0.0)).collect();

    let alpha = 1.0 / period as f64;
    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    result[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period..changes.len() {
        avg_gain = alpha * gains[i] + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * losses[i] + (1.0 - alpha) * avg_loss;
        result[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = if avg_loss == 0.0 { 100.0 } else { avg_gain / avg_loss };
    100.0 - (100.0 / (1.0 + rs))
}

/// Last defined value of an indicator series.
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

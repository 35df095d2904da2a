//! Weighted statistics used by the aggregator and scorers
//!
//! Pure math with no domain knowledge. Every function is total: empty or
//! zero-weight input falls back to an unweighted statistic or 0.

pub mod outliers;
pub mod weights;

pub use outliers::{detect_outliers_iqr, detect_outliers_zscore, OutlierDetector};
pub use weights::calculate_weight;

use crate::types::WeightedValue;

/// Arithmetic mean, 0 for empty input
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard median: average of the two middle values for even counts
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Σ(v·w)/Σw, falling back to the plain mean when Σw == 0
pub fn weighted_average(values: &[WeightedValue]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let total_weight: f64 = values.iter().map(|v| v.weight).sum();
    if total_weight == 0.0 {
        let plain: Vec<f64> = values.iter().map(|v| v.value).collect();
        return mean(&plain);
    }

    values.iter().map(|v| v.value * v.weight).sum::<f64>() / total_weight
}

/// First value (by ascending value) whose cumulative weight reaches half
/// the total weight
pub fn weighted_median(values: &[WeightedValue]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let total_weight: f64 = values.iter().map(|v| v.weight).sum();
    if total_weight == 0.0 {
        let plain: Vec<f64> = values.iter().map(|v| v.value).collect();
        return median(&plain);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.value.total_cmp(&b.value));

    let half = total_weight / 2.0;
    let mut cumulative = 0.0;
    for v in &sorted {
        cumulative += v.weight;
        if cumulative >= half {
            return v.value;
        }
    }

    // Only reachable through float rounding on the final sum
    sorted[sorted.len() - 1].value
}

/// Volume-Weighted Average Price
///
/// VWAP = Σ(Price × Volume) / Σ(Volume), unweighted mean when Σ(Volume) == 0
pub fn vwap(samples: &[(f64, f64)]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sum_pv = 0.0;
    let mut sum_v = 0.0;
    for (price, volume) in samples {
        sum_pv += price * volume;
        sum_v += volume;
    }

    if sum_v == 0.0 {
        let prices: Vec<f64> = samples.iter().map(|(p, _)| *p).collect();
        return mean(&prices);
    }

    sum_pv / sum_v
}

/// Time-Weighted Average Price over (price, timestamp ms) samples
///
/// Each price is weighted by the time until the next sample; the last
/// sample gets the average interval.
pub fn twap(samples: &[(f64, i64)]) -> f64 {
    match samples.len() {
        0 => return 0.0,
        1 => return samples[0].0,
        _ => {}
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by_key(|(_, ts)| *ts);

    let n = sorted.len();
    let span = (sorted[n - 1].1 - sorted[0].1) as f64;
    let avg_delta = span / (n - 1) as f64;

    let mut weighted_sum = 0.0;
    let mut total_time = 0.0;
    for (i, (price, ts)) in sorted.iter().enumerate() {
        let delta = match sorted.get(i + 1) {
            Some((_, next_ts)) => (next_ts - ts) as f64,
            None => avg_delta,
        };
        weighted_sum += price * delta;
        total_time += delta;
    }

    if total_time == 0.0 {
        let prices: Vec<f64> = sorted.iter().map(|(p, _)| *p).collect();
        return mean(&prices);
    }

    weighted_sum / total_time
}

/// Population variance (divides by n)
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation, 0 for fewer than two samples
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Gini coefficient: 0 = perfectly equal, (n-1)/n = one holder of everything
pub fn gini_coefficient(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let ranked_sum: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (i as f64 + 1.0) * x)
        .sum();

    (2.0 * ranked_sum) / (n * total) - (n + 1.0) / n
}

//! Outlier detection over a group of price samples
//!
//! Both algorithms return the indices of flagged samples in their original
//! order, so callers can drop the matching candles.

use crate::config::{OutlierConfig, OutlierMethod};

use super::{mean, std_dev};

/// Fewest samples for which IQR quartiles are meaningful
pub const MIN_IQR_SAMPLES: usize = 4;

/// Fewest samples for a z-score
pub const MIN_ZSCORE_SAMPLES: usize = 2;

/// Flag values outside [Q1 - k·IQR, Q3 + k·IQR]
pub fn detect_outliers_iqr(values: &[f64], k: f64) -> Vec<usize> {
    let n = values.len();
    if n < MIN_IQR_SAMPLES {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = sorted[(n as f64 * 0.25).floor() as usize];
    let q3 = sorted[(n as f64 * 0.75).floor() as usize];
    let iqr = q3 - q1;
    let lower = q1 - k * iqr;
    let upper = q3 + k * iqr;

    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < lower || **v > upper)
        .map(|(i, _)| i)
        .collect()
}

/// Flag values more than `threshold` population std-devs from the mean
pub fn detect_outliers_zscore(values: &[f64], threshold: f64) -> Vec<usize> {
    if values.len() < MIN_ZSCORE_SAMPLES {
        return Vec::new();
    }

    let m = mean(values);
    let sd = std_dev(values);
    if sd == 0.0 {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter(|(_, v)| ((**v - m) / sd).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Configured outlier detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierDetector {
    method: OutlierMethod,
    threshold: f64,
}

impl OutlierDetector {
    pub fn new(method: OutlierMethod, threshold: f64) -> Self {
        Self { method, threshold }
    }

    /// Detector for an enabled config, `None` when detection is off
    pub fn from_config(config: &OutlierConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.method, config.threshold))
    }

    pub fn detect(&self, values: &[f64]) -> Vec<usize> {
        match self.method {
            OutlierMethod::Iqr => detect_outliers_iqr(values, self.threshold),
            OutlierMethod::ZScore => detect_outliers_zscore(values, self.threshold),
        }
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new(OutlierMethod::Iqr, OutlierMethod::Iqr.default_threshold())
    }
}

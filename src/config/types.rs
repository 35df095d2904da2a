//! Aggregation configuration types and named presets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::types::Timeframe;

/// Normalize a user-supplied name: lowercase, no separators
fn canonical(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// How open/close prices are combined across exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AggregationMethod {
    Vwap,
    Twap,
    MarketShare,
    Liquidity,
    Dominance,
    Equal,
    Median,
}

impl AggregationMethod {
    pub fn all() -> &'static [AggregationMethod] {
        &[
            AggregationMethod::Vwap,
            AggregationMethod::Twap,
            AggregationMethod::MarketShare,
            AggregationMethod::Liquidity,
            AggregationMethod::Dominance,
            AggregationMethod::Equal,
            AggregationMethod::Median,
        ]
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationMethod::Vwap => write!(f, "vwap"),
            AggregationMethod::Twap => write!(f, "twap"),
            AggregationMethod::MarketShare => write!(f, "market_share"),
            AggregationMethod::Liquidity => write!(f, "liquidity"),
            AggregationMethod::Dominance => write!(f, "dominance"),
            AggregationMethod::Equal => write!(f, "equal"),
            AggregationMethod::Median => write!(f, "median"),
        }
    }
}

impl FromStr for AggregationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "vwap" => Ok(AggregationMethod::Vwap),
            "twap" => Ok(AggregationMethod::Twap),
            "marketshare" => Ok(AggregationMethod::MarketShare),
            "liquidity" => Ok(AggregationMethod::Liquidity),
            "dominance" => Ok(AggregationMethod::Dominance),
            "equal" => Ok(AggregationMethod::Equal),
            "median" => Ok(AggregationMethod::Median),
            _ => Err(ConfigError::UnknownMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for AggregationMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AggregationMethod> for String {
    fn from(value: AggregationMethod) -> Self {
        value.to_string()
    }
}

/// Outlier detection algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutlierMethod {
    Iqr,
    ZScore,
}

impl OutlierMethod {
    /// IQR fence multiplier k, or z-score cutoff
    pub fn default_threshold(&self) -> f64 {
        match self {
            OutlierMethod::Iqr => 1.5,
            OutlierMethod::ZScore => 3.0,
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr => write!(f, "iqr"),
            OutlierMethod::ZScore => write!(f, "zscore"),
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" | "z" => Ok(OutlierMethod::ZScore),
            _ => Err(ConfigError::UnknownOutlierMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for OutlierMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutlierMethod> for String {
    fn from(value: OutlierMethod) -> Self {
        value.to_string()
    }
}

/// How each exchange's reference price is chosen when normalizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CenterMethod {
    /// Chronologically first bucketed close
    First,
    Average,
    Median,
}

impl Default for CenterMethod {
    fn default() -> Self {
        CenterMethod::First
    }
}

impl fmt::Display for CenterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CenterMethod::First => write!(f, "first"),
            CenterMethod::Average => write!(f, "average"),
            CenterMethod::Median => write!(f, "median"),
        }
    }
}

impl FromStr for CenterMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "first" => Ok(CenterMethod::First),
            "average" | "mean" => Ok(CenterMethod::Average),
            "median" => Ok(CenterMethod::Median),
            _ => Err(ConfigError::UnknownCenterMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for CenterMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CenterMethod> for String {
    fn from(value: CenterMethod) -> Self {
        value.to_string()
    }
}

/// Named default configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Conservative,
    Standard,
    Aggressive,
    Research,
    Liquidity,
    Regulatory,
    Twap,
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Conservative => write!(f, "conservative"),
            Preset::Standard => write!(f, "standard"),
            Preset::Aggressive => write!(f, "aggressive"),
            Preset::Research => write!(f, "research"),
            Preset::Liquidity => write!(f, "liquidity"),
            Preset::Regulatory => write!(f, "regulatory"),
            Preset::Twap => write!(f, "twap"),
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "conservative" => Ok(Preset::Conservative),
            "standard" => Ok(Preset::Standard),
            "aggressive" => Ok(Preset::Aggressive),
            "research" => Ok(Preset::Research),
            "liquidity" => Ok(Preset::Liquidity),
            "regulatory" => Ok(Preset::Regulatory),
            "twap" => Ok(Preset::Twap),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

/// Outlier detection settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    pub enabled: bool,
    pub method: OutlierMethod,
    pub threshold: f64,
}

impl OutlierConfig {
    pub fn new(method: OutlierMethod, threshold: f64) -> Result<Self, ConfigError> {
        let config = Self {
            enabled: true,
            method,
            threshold,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn iqr() -> Self {
        Self {
            enabled: true,
            method: OutlierMethod::Iqr,
            threshold: OutlierMethod::Iqr.default_threshold(),
        }
    }

    pub fn zscore() -> Self {
        Self {
            enabled: true,
            method: OutlierMethod::ZScore,
            threshold: OutlierMethod::ZScore.default_threshold(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawAggregationConfig {
    method: AggregationMethod,
    #[serde(default)]
    timeframe: Timeframe,
    #[serde(default = "default_true")]
    use_real_high_low: bool,
    #[serde(default)]
    outlier_detection: Option<OutlierConfig>,
    #[serde(default)]
    min_exchanges: Option<usize>,
}

fn default_true() -> bool {
    true
}

/// Immutable, validated aggregation settings supplied per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAggregationConfig")]
pub struct AggregationConfig {
    method: AggregationMethod,
    timeframe: Timeframe,
    use_real_high_low: bool,
    outlier_detection: Option<OutlierConfig>,
    min_exchanges: usize,
}

impl TryFrom<RawAggregationConfig> for AggregationConfig {
    type Error = ConfigError;

    fn try_from(raw: RawAggregationConfig) -> Result<Self, Self::Error> {
        let config = Self::new(raw.method, raw.timeframe).with_real_high_low(raw.use_real_high_low);
        let config = match raw.outlier_detection {
            Some(outliers) => config.with_outlier_detection(outliers)?,
            None => config,
        };
        config.with_min_exchanges(raw.min_exchanges.unwrap_or(1))
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::preset(Preset::Standard)
    }
}

impl AggregationConfig {
    /// Bare config: no outlier detection, a single exchange suffices
    pub fn new(method: AggregationMethod, timeframe: Timeframe) -> Self {
        Self {
            method,
            timeframe,
            use_real_high_low: true,
            outlier_detection: None,
            min_exchanges: 1,
        }
    }

    pub fn preset(preset: Preset) -> Self {
        let (method, outliers, min_exchanges) = match preset {
            Preset::Conservative => (AggregationMethod::Median, Some(OutlierConfig::iqr()), 3),
            Preset::Standard => (AggregationMethod::Vwap, Some(OutlierConfig::iqr()), 2),
            Preset::Aggressive => (AggregationMethod::Vwap, None, 1),
            Preset::Research => (AggregationMethod::Equal, Some(OutlierConfig::zscore()), 1),
            Preset::Liquidity => (
                AggregationMethod::Liquidity,
                Some(OutlierConfig {
                    threshold: 2.0,
                    ..OutlierConfig::iqr()
                }),
                2,
            ),
            Preset::Regulatory => (
                AggregationMethod::Median,
                Some(OutlierConfig {
                    threshold: 2.5,
                    ..OutlierConfig::zscore()
                }),
                3,
            ),
            Preset::Twap => (AggregationMethod::Twap, Some(OutlierConfig::iqr()), 1),
        };

        Self {
            method,
            timeframe: Timeframe::default(),
            use_real_high_low: true,
            outlier_detection: outliers,
            min_exchanges,
        }
    }

    pub fn with_method(mut self, method: AggregationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// Kept for compatibility; high/low are always real extrema.
    pub fn with_real_high_low(mut self, use_real_high_low: bool) -> Self {
        self.use_real_high_low = use_real_high_low;
        self
    }

    pub fn with_outlier_detection(mut self, outliers: OutlierConfig) -> Result<Self, ConfigError> {
        outliers.validate()?;
        self.outlier_detection = Some(outliers);
        Ok(self)
    }

    pub fn without_outlier_detection(mut self) -> Self {
        self.outlier_detection = None;
        self
    }

    pub fn with_min_exchanges(mut self, min_exchanges: usize) -> Result<Self, ConfigError> {
        if min_exchanges == 0 {
            return Err(ConfigError::InvalidMinExchanges);
        }
        self.min_exchanges = min_exchanges;
        Ok(self)
    }

    pub fn method(&self) -> AggregationMethod {
        self.method
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn timeframe_ms(&self) -> i64 {
        self.timeframe.duration_ms()
    }

    /// Carried for config compatibility; the aggregator always uses the
    /// real extrema of surviving candles
    pub fn use_real_high_low(&self) -> bool {
        self.use_real_high_low
    }

    pub fn outlier_detection(&self) -> Option<&OutlierConfig> {
        self.outlier_detection.as_ref()
    }

    /// Outlier settings only when detection is switched on
    pub fn active_outlier_detection(&self) -> Option<&OutlierConfig> {
        self.outlier_detection.as_ref().filter(|o| o.enabled)
    }

    pub fn min_exchanges(&self) -> usize {
        self.min_exchanges
    }
}

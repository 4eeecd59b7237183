use crate::error::EngineError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Thresholds for the single-candle reversal rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Minimum diagnostic-wick share of the total range
    pub long_wick_ratio: f64,
    /// Maximum body share of the total range
    pub small_body_ratio: f64,
    /// Maximum share allowed on the non-diagnostic wick
    pub max_opposite_wick_ratio: f64,
    /// Minimum wick-size / body-size multiple
    pub wick_body_multiplier: f64,
    pub base_confidence: f64,
    pub confidence_bonus: f64,
    /// Bonus thresholds: exceeding the base rules by this margin earns extra
    /// confidence
    pub bonus_wick_ratio: f64,
    pub bonus_body_ratio: f64,
    pub bonus_opposite_wick_ratio: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            long_wick_ratio: 0.60,
            small_body_ratio: 0.30,
            max_opposite_wick_ratio: 0.15,
            wick_body_multiplier: 2.0,
            base_confidence: 0.70,
            confidence_bonus: 0.10,
            bonus_wick_ratio: 0.70,
            bonus_body_ratio: 0.20,
            bonus_opposite_wick_ratio: 0.10,
        }
    }
}

/// EMA stack and score buckets for trend scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Periods in increasing order; every period must be populated for a
    /// candle to be scorable
    pub ema_periods: Vec<u32>,
    /// Scores at or beyond this magnitude are a strong trend
    pub strong_threshold: i32,
    /// Scores at or beyond this magnitude (but below strong) are a weak trend
    pub weak_threshold: i32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            ema_periods: vec![3, 5, 7, 10, 20, 30, 50, 200],
            strong_threshold: 6,
            weak_threshold: 1,
        }
    }
}

/// Bollinger band parameters for the exhaustion check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerConfig {
    pub period: usize,
    pub std_dev_multiplier: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

/// Defaults for historical probability queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub lookback_days: i64,
    pub score_tolerance: i32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            score_tolerance: 2,
        }
    }
}

/// Top-level engine settings. The bootstrap layer owns where these come from;
/// `load` layers an optional file under a `SIGNAL`-prefixed environment
/// override, and everything falls back to the documented defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pattern: PatternConfig,
    pub trend: TrendConfig,
    pub bollinger: BollingerConfig,
    pub query: QueryConfig,
    pub archive_path: PathBuf,
}

impl EngineConfig {
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SIGNAL").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

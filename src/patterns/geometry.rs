use serde::{Deserialize, Serialize};

/// Normalized shape metrics for one candle. Ratios are pre-divided here so the
/// classifier itself never divides; a zero-range candle yields all-zero ratios
/// instead of a division error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleMetrics {
    pub total_range: f64,
    pub body_size: f64,
    pub upper_wick: f64,
    pub lower_wick: f64,
    pub body_ratio: f64,
    pub upper_wick_ratio: f64,
    pub lower_wick_ratio: f64,
}

impl CandleMetrics {
    /// Computes the metrics from four prices. The data source guarantees
    /// high >= max(open, close) and low <= min(open, close); that invariant is
    /// not re-validated here.
    pub fn from_ohlc(open: f64, high: f64, low: f64, close: f64) -> Self {
        let total_range = high - low;
        let body_size = (open - close).abs();
        let upper_wick = high - open.max(close);
        let lower_wick = open.min(close) - low;

        if total_range == 0.0 {
            return Self {
                total_range: 0.0,
                body_size: 0.0,
                upper_wick: 0.0,
                lower_wick: 0.0,
                body_ratio: 0.0,
                upper_wick_ratio: 0.0,
                lower_wick_ratio: 0.0,
            };
        }

        Self {
            total_range,
            body_size,
            upper_wick,
            lower_wick,
            body_ratio: body_size / total_range,
            upper_wick_ratio: upper_wick / total_range,
            lower_wick_ratio: lower_wick / total_range,
        }
    }

    /// True for the degenerate high == low candle; every pattern check must
    /// reject it outright.
    pub fn is_flat(&self) -> bool {
        self.total_range == 0.0
    }
}

use crate::indicators::BollingerBandsValue;
use crate::models::{BollingerZone, Candle, ExhaustionState, PatternType};

/// Detects whether a candle reached an extreme and was rejected: a close
/// outside the volatility band, or a breach of the previous candle's extreme
/// on the side the pattern cares about.
pub struct ExhaustionDetector;

impl ExhaustionDetector {
    /// Band piercing: close above the upper band is a peak, below the lower
    /// band a bottom. No bands available means no zone.
    pub fn bollinger_zone(close: f64, bands: Option<&BollingerBandsValue>) -> BollingerZone {
        match bands {
            Some(bands) if close > bands.upper => BollingerZone::Peak,
            Some(bands) if close < bands.lower => BollingerZone::Bottom,
            _ => BollingerZone::None,
        }
    }

    /// Prior-extreme rejection: a bearish pattern's candle broke above the
    /// previous high and closed back; a bullish pattern's candle broke below
    /// the previous low. No pattern or no previous candle is simply false,
    /// never an error.
    pub fn candle_exhaustion(
        pattern: Option<PatternType>,
        candle: &Candle,
        previous: Option<&Candle>,
    ) -> bool {
        let (Some(pattern), Some(previous)) = (pattern, previous) else {
            return false;
        };

        match pattern.direction() {
            crate::models::Direction::Bearish => candle.high > previous.high,
            crate::models::Direction::Bullish => candle.low < previous.low,
        }
    }

    pub fn detect(
        pattern: Option<PatternType>,
        candle: &Candle,
        previous: Option<&Candle>,
        bands: Option<&BollingerBandsValue>,
    ) -> ExhaustionState {
        ExhaustionState {
            bollinger_zone: Self::bollinger_zone(candle.close, bands),
            candle_exhaustion: Self::candle_exhaustion(pattern, candle, previous),
        }
    }
}

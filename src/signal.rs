use crate::config::EngineConfig;
use crate::exhaustion::ExhaustionDetector;
use crate::indicators::BollingerBandsValue;
use crate::models::{
    Candle, EmaSet, ExhaustionState, PatternType, Signal, SignalStrength, TrendStatus,
};
use crate::patterns::PatternClassifier;
use crate::trend::TrendScorer;
use tracing::debug;
use uuid::Uuid;

/// Maps (trend side, pattern, exhaustion evidence) to a strength tier.
///
/// Only counter-trend pairings register: a bearish-reversal pattern needs a
/// bullish trend to reverse, and vice versa. Within a pairing the tier
/// degrades monotonically as exhaustion evidence is removed; the secondary
/// pattern of each side needs at least one exhaustion signal to register at
/// all.
pub struct SignalClassifier;

impl SignalClassifier {
    pub fn classify(
        pattern: PatternType,
        trend: TrendStatus,
        exhaustion: &ExhaustionState,
    ) -> Option<SignalStrength> {
        let aligned = match pattern.direction() {
            crate::models::Direction::Bearish => trend.is_bullish(),
            crate::models::Direction::Bullish => trend.is_bearish(),
        };
        if !aligned {
            return None;
        }

        let bollinger_hit = exhaustion.bollinger_supports(pattern.direction());
        let candle_hit = exhaustion.candle_exhaustion;

        // Exhaustive over the whole (primary, bollinger, candle) product so a
        // missing combination is a compile error, not a silent fallthrough.
        match (pattern.is_primary(), bollinger_hit, candle_hit) {
            (true, true, true) => Some(SignalStrength::VeryHigh),
            (true, true, false) => Some(SignalStrength::High),
            (true, false, true) => Some(SignalStrength::Medium),
            (true, false, false) => Some(SignalStrength::Low),
            (false, true, true) => Some(SignalStrength::High),
            (false, true, false) => Some(SignalStrength::Medium),
            (false, false, true) => Some(SignalStrength::Low),
            (false, false, false) => None,
        }
    }
}

/// End-to-end per-candle evaluation: geometry, pattern rules, trend score,
/// exhaustion evidence, strength tier. One signal per qualifying candle.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    patterns: PatternClassifier,
    trend: TrendScorer,
}

impl SignalEvaluator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            patterns: PatternClassifier::new(config.pattern.clone()),
            trend: TrendScorer::new(config.trend.clone()),
        }
    }

    /// Returns a signal only when a pattern matches, the trend is scorable
    /// and aligned against it, and the decision table yields a strength.
    pub fn evaluate(
        &self,
        candle: &Candle,
        previous: Option<&Candle>,
        emas: &EmaSet,
        bands: Option<&BollingerBandsValue>,
    ) -> Option<Signal> {
        let result = self.patterns.classify(candle);
        let pattern = result.pattern?;

        let Some(trend) = self.trend.score(candle.close, emas) else {
            debug!(symbol = %candle.symbol, "incomplete EMA set, candle not evaluated");
            return None;
        };

        let exhaustion = ExhaustionDetector::detect(Some(pattern), candle, previous, bands);
        let strength = SignalClassifier::classify(pattern, trend.status, &exhaustion)?;

        Some(Signal {
            id: Uuid::new_v4(),
            timestamp: candle.timestamp,
            source: candle.source.clone(),
            symbol: candle.symbol.clone(),
            pattern,
            confidence: result.confidence,
            trend,
            exhaustion,
            strength,
            direction: pattern.direction(),
        })
    }
}

impl Default for SignalEvaluator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

use crate::config::PatternConfig;
use crate::models::{Candle, PatternResult, PatternType};
use crate::patterns::geometry::CandleMetrics;
use tracing::debug;

/// Applies the threshold rules to a candle's geometry and decides which of the
/// four reversal patterns (if any) it exhibits. Pure and reentrant: safe to
/// call from any number of contexts without synchronization.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    config: PatternConfig,
}

impl PatternClassifier {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    /// Evaluates the candle against every pattern whose color precondition it
    /// can meet. The four patterns partition by candle color and then by wick
    /// side, so at most one can match.
    pub fn classify(&self, candle: &Candle) -> PatternResult {
        let metrics = CandleMetrics::from_ohlc(candle.open, candle.high, candle.low, candle.close);
        if metrics.is_flat() {
            return PatternResult::rejected(vec!["no range: high equals low".to_string()]);
        }

        let candidates: [PatternType; 2] = if candle.close <= candle.open {
            [PatternType::ShootingStar, PatternType::HangingMan]
        } else {
            [PatternType::InvertedHammer, PatternType::Hammer]
        };

        let mut reasons = Vec::new();
        for pattern in candidates {
            let result = self.check_metrics(pattern, candle, &metrics);
            if result.pattern.is_some() {
                return result;
            }
            reasons.extend(
                result
                    .rejection_reasons
                    .into_iter()
                    .map(|reason| format!("{pattern}: {reason}")),
            );
        }

        debug!(symbol = %candle.symbol, "no reversal pattern: {:?}", reasons);
        PatternResult::rejected(reasons)
    }

    /// Runs a single pattern's rules against the candle, reporting every
    /// failed condition as a distinct human-readable reason.
    pub fn check(&self, pattern: PatternType, candle: &Candle) -> PatternResult {
        let metrics = CandleMetrics::from_ohlc(candle.open, candle.high, candle.low, candle.close);
        self.check_metrics(pattern, candle, &metrics)
    }

    fn check_metrics(
        &self,
        pattern: PatternType,
        candle: &Candle,
        metrics: &CandleMetrics,
    ) -> PatternResult {
        if metrics.is_flat() {
            return PatternResult::rejected(vec!["no range: high equals low".to_string()]);
        }

        // Mandatory color precondition; a violation rejects before any
        // geometry is inspected.
        let color_ok = match pattern {
            PatternType::ShootingStar | PatternType::HangingMan => candle.close <= candle.open,
            PatternType::InvertedHammer | PatternType::Hammer => candle.close > candle.open,
        };
        if !color_ok {
            let expected = match pattern {
                PatternType::ShootingStar | PatternType::HangingMan => "close <= open",
                PatternType::InvertedHammer | PatternType::Hammer => "close > open",
            };
            return PatternResult::rejected(vec![format!(
                "wrong candle color: expected {expected}"
            )]);
        }

        // Diagnostic wick side: upper for shooting star / inverted hammer,
        // lower for hanging man / hammer.
        let (side, wick_ratio, wick_size, opposite_side, opposite_ratio) = match pattern {
            PatternType::ShootingStar | PatternType::InvertedHammer => (
                "upper",
                metrics.upper_wick_ratio,
                metrics.upper_wick,
                "lower",
                metrics.lower_wick_ratio,
            ),
            PatternType::HangingMan | PatternType::Hammer => (
                "lower",
                metrics.lower_wick_ratio,
                metrics.lower_wick,
                "upper",
                metrics.upper_wick_ratio,
            ),
        };

        let cfg = &self.config;
        let mut reasons = Vec::new();

        if wick_ratio < cfg.long_wick_ratio {
            reasons.push(format!(
                "{side} wick ratio {wick_ratio:.2} below required {:.2}",
                cfg.long_wick_ratio
            ));
        }
        if metrics.body_ratio > cfg.small_body_ratio {
            reasons.push(format!(
                "body ratio {:.2} above maximum {:.2}",
                metrics.body_ratio, cfg.small_body_ratio
            ));
        }
        if opposite_ratio > cfg.max_opposite_wick_ratio {
            reasons.push(format!(
                "{opposite_side} wick ratio {opposite_ratio:.2} above maximum {:.2}",
                cfg.max_opposite_wick_ratio
            ));
        }
        // A zero body makes the wick-to-body ratio undefined; the condition is
        // defined as failing rather than dividing.
        if metrics.body_size == 0.0 {
            reasons.push(format!(
                "zero body: {side} wick to body ratio undefined"
            ));
        } else if wick_size / metrics.body_size < cfg.wick_body_multiplier {
            reasons.push(format!(
                "{side} wick only {:.2}x body, need {:.2}x",
                wick_size / metrics.body_size,
                cfg.wick_body_multiplier
            ));
        }

        if !reasons.is_empty() {
            return PatternResult::rejected(reasons);
        }

        // Base confidence plus a fixed bonus per threshold cleared by a wide
        // margin, capped at 1.0.
        let mut confidence = cfg.base_confidence;
        if wick_ratio >= cfg.bonus_wick_ratio {
            confidence += cfg.confidence_bonus;
        }
        if metrics.body_ratio <= cfg.bonus_body_ratio {
            confidence += cfg.confidence_bonus;
        }
        if opposite_ratio <= cfg.bonus_opposite_wick_ratio {
            confidence += cfg.confidence_bonus;
        }

        PatternResult::detected(pattern, confidence.min(1.0))
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(PatternConfig::default())
    }
}

use crate::config::TrendConfig;
use crate::models::{EmaSet, TrendAnalysis, TrendStatus};
use std::cmp::Ordering;
use tracing::debug;

/// Scores how cleanly price and the EMA stack are ordered into a trend.
///
/// This is a pure function of (close, EmaSet, config): identical inputs always
/// produce identical output. That determinism is what allows the probability
/// engine to re-derive comparable scores for archived records after the
/// scoring logic changes, so the scorer must never grow hidden state.
#[derive(Debug, Clone)]
pub struct TrendScorer {
    config: TrendConfig,
}

impl TrendScorer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn periods(&self) -> &[u32] {
        &self.config.ema_periods
    }

    /// Returns `None` when any configured period is missing from the set; an
    /// incomplete stack means "cannot evaluate", never a zero score.
    pub fn score(&self, close: f64, emas: &EmaSet) -> Option<TrendAnalysis> {
        let mut values = Vec::with_capacity(self.config.ema_periods.len() + 1);
        let mut labels = Vec::with_capacity(self.config.ema_periods.len() + 1);

        values.push(close);
        labels.push("P".to_string());
        for period in &self.config.ema_periods {
            match emas.get(period) {
                Some(value) => {
                    values.push(*value);
                    labels.push(period.to_string());
                }
                None => {
                    debug!(period, "EMA period missing, trend not scorable");
                    return None;
                }
            }
        }

        // +1 per bullish-stacked pair (shorter above longer, price above the
        // shortest), -1 per inverted pair, 0 for exact ties.
        let max_score = self.config.ema_periods.len() as i32;
        let mut score = 0;
        let mut alignment = labels[0].clone();
        for i in 1..values.len() {
            let (sep, delta) = match values[i - 1]
                .partial_cmp(&values[i])
                .unwrap_or(Ordering::Equal)
            {
                Ordering::Greater => (">", 1),
                Ordering::Less => ("<", -1),
                Ordering::Equal => ("=", 0),
            };
            score += delta;
            alignment.push_str(sep);
            alignment.push_str(&labels[i]);
        }
        let score = score.clamp(-max_score, max_score);

        Some(TrendAnalysis {
            score,
            status: self.bucket(score),
            alignment,
        })
    }

    // Bucketing is inclusive at each boundary, evaluated from the most
    // extreme tier inward: a score equal to the weak threshold is a weak
    // trend, not neutral.
    fn bucket(&self, score: i32) -> TrendStatus {
        let strong = self.config.strong_threshold;
        let weak = self.config.weak_threshold;
        if score >= strong {
            TrendStatus::StrongBullish
        } else if score >= weak {
            TrendStatus::WeakBullish
        } else if score <= -strong {
            TrendStatus::StrongBearish
        } else if score <= -weak {
            TrendStatus::WeakBearish
        } else {
            TrendStatus::Neutral
        }
    }
}

impl Default for TrendScorer {
    fn default() -> Self {
        Self::new(TrendConfig::default())
    }
}

use crate::config::QueryConfig;
use crate::history::engine::ScoredRecord;
use crate::models::{BollingerZone, Direction, PatternType, Signal};
use serde::{Deserialize, Serialize};

/// How many of the most recent outcome directions each tier reports.
pub const STREAK_LENGTH: usize = 5;

/// Parameters for one historical-probability lookup. Pattern, instrument and
/// zone are hard filters (exact, never relaxed); score and alignment feed the
/// fuzzy tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityQuery {
    pub pattern: PatternType,
    pub score: i32,
    pub bollinger_zone: BollingerZone,
    pub source: String,
    pub symbol: String,
    /// When supplied, the exact tier additionally requires this alignment
    pub alignment: Option<String>,
    pub lookback_days: i64,
    pub score_tolerance: i32,
}

impl ProbabilityQuery {
    /// Builds the lookup for a freshly produced signal, the usual caller:
    /// the flow that just classified a candle and wants historical context
    /// before notifying.
    pub fn for_signal(signal: &Signal, defaults: &QueryConfig) -> Self {
        Self {
            pattern: signal.pattern,
            score: signal.trend.score,
            bollinger_zone: signal.exhaustion.bollinger_zone,
            source: signal.source.clone(),
            symbol: signal.symbol.clone(),
            alignment: Some(signal.trend.alignment.clone()),
            lookback_days: defaults.lookback_days,
            score_tolerance: defaults.score_tolerance,
        }
    }
}

/// Empirical statistics for one tier of matched records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierStats {
    pub total_cases: usize,
    pub bullish_cases: usize,
    pub bearish_cases: usize,
    pub bullish_pct: f64,
    pub bearish_pct: f64,
    /// Share of cases whose realized direction matched the expectation the
    /// record was archived with
    pub success_rate: f64,
    /// Most recent outcome directions, newest first
    pub recent_outcomes: Vec<Direction>,
}

impl TierStats {
    /// The zero-case sentinel: well-formed, never a partial result.
    pub fn empty() -> Self {
        Self {
            total_cases: 0,
            bullish_cases: 0,
            bearish_cases: 0,
            bullish_pct: 0.0,
            bearish_pct: 0.0,
            success_rate: 0.0,
            recent_outcomes: Vec::new(),
        }
    }

    /// Aggregates a tier. Records must already be ordered newest-first so the
    /// streak falls out of the prefix.
    pub(crate) fn from_records(records: &[&ScoredRecord]) -> Self {
        if records.is_empty() {
            return Self::empty();
        }

        let total = records.len();
        let bullish = records
            .iter()
            .filter(|r| r.record.outcome.actual_direction == Direction::Bullish)
            .count();
        let bearish = total - bullish;
        let successes = records.iter().filter(|r| r.record.outcome.success).count();

        Self {
            total_cases: total,
            bullish_cases: bullish,
            bearish_cases: bearish,
            bullish_pct: bullish as f64 / total as f64 * 100.0,
            bearish_pct: bearish as f64 / total as f64 * 100.0,
            success_rate: successes as f64 / total as f64 * 100.0,
            recent_outcomes: records
                .iter()
                .take(STREAK_LENGTH)
                .map(|r| r.record.outcome.actual_direction)
                .collect(),
        }
    }
}

/// The three nested result tiers for one query, narrowest first, plus the
/// query context echoed back for the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityResponse {
    pub pattern: PatternType,
    /// The direction the pattern anticipates
    pub expected_direction: Direction,
    /// Requested exhaustion zone, echoed
    pub bollinger_zone: BollingerZone,
    /// Requested window, echoed
    pub lookback_days: i64,
    /// score and alignment both match
    pub exact: TierStats,
    /// score matches
    pub by_score: TierStats,
    /// score within tolerance
    pub by_range: TierStats,
}

impl ProbabilityResponse {
    /// Response for a query whose hard-filtered subset is empty.
    pub fn empty(query: &ProbabilityQuery) -> Self {
        Self {
            pattern: query.pattern,
            expected_direction: query.pattern.direction(),
            bollinger_zone: query.bollinger_zone,
            lookback_days: query.lookback_days,
            exact: TierStats::empty(),
            by_score: TierStats::empty(),
            by_range: TierStats::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoricalRecord, Outcome, SignalStrength};
    use chrono::{TimeZone, Utc};

    fn scored(actual: Direction, success: bool, ts: i64) -> ScoredRecord {
        ScoredRecord {
            record: HistoricalRecord {
                timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
                source: "mt5".to_string(),
                symbol: "EURUSD".to_string(),
                pattern: PatternType::ShootingStar,
                confidence: 0.8,
                strength: SignalStrength::High,
                bollinger_zone: BollingerZone::Peak,
                candle_exhaustion: false,
                raw_inputs: None,
                outcome: Outcome {
                    expected_direction: Direction::Bearish,
                    actual_direction: actual,
                    success,
                    pnl: if success { 5.0 } else { -5.0 },
                },
            },
            calculated: None,
        }
    }

    #[test]
    fn empty_tier_is_all_zeroes() {
        let stats = TierStats::empty();
        assert_eq!(stats.total_cases, 0);
        assert_eq!(stats.bullish_pct, 0.0);
        assert!(stats.recent_outcomes.is_empty());
    }

    #[test]
    fn stats_count_directions_and_successes() {
        let records = vec![
            scored(Direction::Bearish, true, 300),
            scored(Direction::Bullish, false, 200),
            scored(Direction::Bearish, true, 100),
        ];
        let refs: Vec<&ScoredRecord> = records.iter().collect();
        let stats = TierStats::from_records(&refs);
        assert_eq!(stats.total_cases, 3);
        assert_eq!(stats.bearish_cases, 2);
        assert_eq!(stats.bullish_cases, 1);
        assert!((stats.bearish_pct - 200.0 / 3.0).abs() < 1e-9);
        assert!((stats.success_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn streak_is_capped_and_newest_first() {
        let records: Vec<ScoredRecord> = (0..8)
            .map(|i| scored(Direction::Bearish, true, 1000 - i))
            .collect();
        let refs: Vec<&ScoredRecord> = records.iter().collect();
        let stats = TierStats::from_records(&refs);
        assert_eq!(stats.recent_outcomes.len(), STREAK_LENGTH);
    }
}

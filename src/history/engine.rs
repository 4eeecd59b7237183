use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::history::archive;
use crate::history::query::{ProbabilityQuery, ProbabilityResponse, TierStats};
use crate::models::{HistoricalRecord, TrendAnalysis};
use crate::trend::TrendScorer;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A loaded record annotated with the trend analysis re-derived by the
/// *current* scorer from the record's archived raw inputs. Never persisted:
/// recomputing at load time is what makes scoring changes apply uniformly to
/// all of history without a migration step.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: HistoricalRecord,
    /// `None` when the record carries no usable raw inputs; such records are
    /// excluded from every score-based tier
    pub calculated: Option<TrendAnalysis>,
}

/// One immutable generation of the loaded archive, ordered newest-first.
#[derive(Debug)]
struct Snapshot {
    records: Vec<ScoredRecord>,
    loaded_at: DateTime<Utc>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            loaded_at: Utc::now(),
        }
    }
}

/// Serves tiered, hard-filtered probability queries over the signal archive.
///
/// The record set is replaced wholesale on load/reload: queries clone the
/// current `Arc` and keep reading their own consistent generation, so a
/// concurrent reload can never expose a torn mix of old and new records.
pub struct ProbabilityEngine {
    archive_path: PathBuf,
    scorer: TrendScorer,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl ProbabilityEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            archive_path: config.archive_path.clone(),
            scorer: TrendScorer::new(config.trend.clone()),
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Loads the archive from disk, rescored and swapped in atomically.
    /// Returns the number of records loaded.
    pub async fn load(&self) -> Result<usize, EngineError> {
        let records = archive::load_records(&self.archive_path).await?;
        Ok(self.install_records(records))
    }

    /// Re-runs the load in full. In-flight queries finish against the
    /// generation they started with.
    pub async fn reload(&self) -> Result<usize, EngineError> {
        self.load().await
    }

    /// Rescores the given records with the current trend scorer and installs
    /// them as the active snapshot. Split out from `load` so callers holding
    /// records from elsewhere can feed the engine directly.
    pub fn install_records(&self, records: Vec<HistoricalRecord>) -> usize {
        let scorer = &self.scorer;
        let mut scored: Vec<ScoredRecord> = records
            .into_par_iter()
            .map(|record| {
                let calculated = record.raw_inputs.as_ref().and_then(|inputs| {
                    inputs
                        .valid_emas(scorer.periods())
                        .and_then(|emas| scorer.score(inputs.close, &emas))
                });
                ScoredRecord { record, calculated }
            })
            .collect();

        // Newest-first so every tier's streak is a prefix.
        scored.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));

        let total = scored.len();
        let unscored = scored.iter().filter(|r| r.calculated.is_none()).count();
        if unscored > 0 {
            info!(
                total,
                unscored, "records without raw inputs excluded from score-based tiers"
            );
        }

        let snapshot = Arc::new(Snapshot {
            records: scored,
            loaded_at: Utc::now(),
        });
        *self.snapshot.write() = snapshot;

        total
    }

    pub fn record_count(&self) -> usize {
        self.snapshot.read().records.len()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.snapshot.read().loaded_at
    }

    /// Answers a probability query against the current snapshot.
    pub fn get_probability(&self, query: &ProbabilityQuery) -> ProbabilityResponse {
        self.get_probability_at(query, Utc::now())
    }

    /// Same as `get_probability` with the clock supplied by the caller, which
    /// pins the lookback window.
    pub fn get_probability_at(
        &self,
        query: &ProbabilityQuery,
        now: DateTime<Utc>,
    ) -> ProbabilityResponse {
        let snapshot = self.snapshot.read().clone();

        // Hard filters, in order, each a strict narrowing: time window,
        // instrument identity, pattern, exhaustion zone. Statistics are never
        // pooled across instruments or zones.
        let cutoff = now - Duration::days(query.lookback_days);
        let matched: Vec<&ScoredRecord> = snapshot
            .records
            .iter()
            .filter(|r| r.record.timestamp >= cutoff)
            .filter(|r| r.record.source == query.source && r.record.symbol == query.symbol)
            .filter(|r| r.record.pattern == query.pattern)
            .filter(|r| r.record.bollinger_zone == query.bollinger_zone)
            .collect();

        if matched.is_empty() {
            debug!(
                pattern = %query.pattern,
                symbol = %query.symbol,
                zone = %query.bollinger_zone,
                "no historical matches for query"
            );
            return ProbabilityResponse::empty(query);
        }

        let tolerance = query.score_tolerance.max(0);
        let by_range: Vec<&ScoredRecord> = matched
            .iter()
            .copied()
            .filter(|r| {
                r.calculated
                    .as_ref()
                    .is_some_and(|c| (c.score - query.score).abs() <= tolerance)
            })
            .collect();

        let by_score: Vec<&ScoredRecord> = by_range
            .iter()
            .copied()
            .filter(|r| {
                r.calculated
                    .as_ref()
                    .is_some_and(|c| c.score == query.score)
            })
            .collect();

        let exact: Vec<&ScoredRecord> = match &query.alignment {
            Some(alignment) => by_score
                .iter()
                .copied()
                .filter(|r| {
                    r.calculated
                        .as_ref()
                        .is_some_and(|c| &c.alignment == alignment)
                })
                .collect(),
            None => by_score.clone(),
        };

        ProbabilityResponse {
            pattern: query.pattern,
            expected_direction: query.pattern.direction(),
            bollinger_zone: query.bollinger_zone,
            lookback_days: query.lookback_days,
            exact: TierStats::from_records(&exact),
            by_score: TierStats::from_records(&by_score),
            by_range: TierStats::from_records(&by_range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BollingerZone, Direction, Outcome, PatternType, RawInputs, SignalStrength,
    };
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn test_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.trend.ema_periods = vec![20, 50];
        config
    }

    // Raw inputs engineered to hit the wanted recomputed score with periods
    // [20, 50]: score 2 is P>20>50, score -2 is P<20<50, score 0 mixes them.
    fn raw_for_score(score: i32) -> RawInputs {
        let (close, e20, e50) = match score {
            2 => (1.10, 1.09, 1.08),
            0 => (1.10, 1.11, 1.08),
            -2 => (1.08, 1.09, 1.10),
            _ => panic!("unsupported score"),
        };
        let mut emas = BTreeMap::new();
        emas.insert(20, e20);
        emas.insert(50, e50);
        RawInputs { close, emas }
    }

    fn record(
        ts: i64,
        symbol: &str,
        pattern: PatternType,
        zone: BollingerZone,
        raw: Option<RawInputs>,
        actual: Direction,
    ) -> HistoricalRecord {
        let expected = pattern.direction();
        HistoricalRecord {
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            source: "mt5".to_string(),
            symbol: symbol.to_string(),
            pattern,
            confidence: 0.8,
            strength: SignalStrength::High,
            bollinger_zone: zone,
            candle_exhaustion: false,
            raw_inputs: raw,
            outcome: Outcome {
                expected_direction: expected,
                actual_direction: actual,
                success: expected == actual,
                pnl: 1.0,
            },
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn day(n: i64) -> i64 {
        1_700_000_000 - n * 86_400
    }

    fn query(score: i32, tolerance: i32) -> ProbabilityQuery {
        ProbabilityQuery {
            pattern: PatternType::ShootingStar,
            score,
            bollinger_zone: BollingerZone::Peak,
            source: "mt5".to_string(),
            symbol: "EURUSD".to_string(),
            alignment: None,
            lookback_days: 90,
            score_tolerance: tolerance,
        }
    }

    #[test]
    fn tiers_are_nested_supersets() {
        let engine = ProbabilityEngine::new(&test_config());
        engine.install_records(vec![
            record(
                day(1),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
            record(
                day(2),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(0)),
                Direction::Bullish,
            ),
            record(
                day(3),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(-2)),
                Direction::Bearish,
            ),
        ]);

        let response = engine.get_probability_at(&query(2, 2), now());
        assert_eq!(response.by_range.total_cases, 2);
        assert_eq!(response.by_score.total_cases, 1);
        assert!(response.exact.total_cases <= response.by_score.total_cases);
        assert!(response.by_score.total_cases <= response.by_range.total_cases);
    }

    #[test]
    fn alignment_narrows_the_exact_tier() {
        let engine = ProbabilityEngine::new(&test_config());
        engine.install_records(vec![record(
            day(1),
            "EURUSD",
            PatternType::ShootingStar,
            BollingerZone::Peak,
            Some(raw_for_score(2)),
            Direction::Bearish,
        )]);

        let mut with_alignment = query(2, 2);
        with_alignment.alignment = Some("P>20>50".to_string());
        let response = engine.get_probability_at(&with_alignment, now());
        assert_eq!(response.exact.total_cases, 1);

        with_alignment.alignment = Some("P<20<50".to_string());
        let response = engine.get_probability_at(&with_alignment, now());
        assert_eq!(response.exact.total_cases, 0);
        assert_eq!(response.by_score.total_cases, 1);
    }

    #[test]
    fn instrument_identity_is_never_crossed() {
        let engine = ProbabilityEngine::new(&test_config());
        engine.install_records(vec![
            record(
                day(1),
                "GBPUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
            record(
                day(2),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
        ]);

        let response = engine.get_probability_at(&query(2, 2), now());
        assert_eq!(response.by_range.total_cases, 1);
    }

    #[test]
    fn exhaustion_zones_are_never_mixed() {
        let engine = ProbabilityEngine::new(&test_config());
        engine.install_records(vec![
            record(
                day(1),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::None,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
            record(
                day(2),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
        ]);

        let response = engine.get_probability_at(&query(2, 2), now());
        assert_eq!(response.by_range.total_cases, 1);
        assert_eq!(response.bollinger_zone, BollingerZone::Peak);
    }

    #[test]
    fn records_outside_the_lookback_window_are_dropped() {
        let engine = ProbabilityEngine::new(&test_config());
        engine.install_records(vec![
            record(
                day(120),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
            record(
                day(5),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
        ]);

        let response = engine.get_probability_at(&query(2, 2), now());
        assert_eq!(response.by_range.total_cases, 1);
    }

    #[test]
    fn records_without_raw_inputs_are_excluded_from_score_tiers() {
        let engine = ProbabilityEngine::new(&test_config());
        engine.install_records(vec![
            record(
                day(1),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                None,
                Direction::Bearish,
            ),
            record(
                day(2),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
        ]);

        let response = engine.get_probability_at(&query(2, 0), now());
        assert_eq!(response.by_range.total_cases, 1);
        assert_eq!(response.by_score.total_cases, 1);
    }

    #[test]
    fn empty_snapshot_returns_zero_case_tiers() {
        let engine = ProbabilityEngine::new(&test_config());
        let response = engine.get_probability_at(&query(2, 2), now());
        assert_eq!(response.exact.total_cases, 0);
        assert_eq!(response.by_score.total_cases, 0);
        assert_eq!(response.by_range.total_cases, 0);
        assert_eq!(response.bollinger_zone, BollingerZone::Peak);
        assert_eq!(response.lookback_days, 90);
        assert!(response.by_range.recent_outcomes.is_empty());
    }

    #[test]
    fn streak_is_newest_first() {
        let engine = ProbabilityEngine::new(&test_config());
        engine.install_records(vec![
            record(
                day(3),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bullish,
            ),
            record(
                day(1),
                "EURUSD",
                PatternType::ShootingStar,
                BollingerZone::Peak,
                Some(raw_for_score(2)),
                Direction::Bearish,
            ),
        ]);

        let response = engine.get_probability_at(&query(2, 2), now());
        assert_eq!(
            response.by_range.recent_outcomes,
            vec![Direction::Bearish, Direction::Bullish]
        );
    }

    #[test]
    fn install_replaces_the_whole_snapshot() {
        let engine = ProbabilityEngine::new(&test_config());
        engine.install_records(vec![record(
            day(1),
            "EURUSD",
            PatternType::ShootingStar,
            BollingerZone::Peak,
            Some(raw_for_score(2)),
            Direction::Bearish,
        )]);
        assert_eq!(engine.record_count(), 1);

        engine.install_records(Vec::new());
        assert_eq!(engine.record_count(), 0);
    }
}

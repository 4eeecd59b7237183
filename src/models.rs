use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// A fully populated EMA stack, keyed by period so iteration always runs
/// shortest-to-longest.
pub type EmaSet = BTreeMap<u32, f64>;

// Stored EMA values at or below this sentinel are treated as missing.
pub const EMA_MISSING_SENTINEL: f64 = -1.0;

/// A closed OHLCV candle as delivered by the market-data collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Epoch seconds of the candle open
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub source: String,
    pub symbol: String,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// The four single-candle reversal shapes the classifier recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternType {
    ShootingStar,
    HangingMan,
    InvertedHammer,
    Hammer,
}

impl PatternType {
    /// Direction of the move the pattern anticipates.
    pub fn direction(&self) -> Direction {
        match self {
            PatternType::ShootingStar | PatternType::HangingMan => Direction::Bearish,
            PatternType::InvertedHammer | PatternType::Hammer => Direction::Bullish,
        }
    }

    /// Primary patterns register a strength even without exhaustion evidence;
    /// secondary ones need at least one exhaustion signal.
    pub fn is_primary(&self) -> bool {
        matches!(self, PatternType::ShootingStar | PatternType::Hammer)
    }

    pub fn all() -> [PatternType; 4] {
        [
            PatternType::ShootingStar,
            PatternType::HangingMan,
            PatternType::InvertedHammer,
            PatternType::Hammer,
        ]
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::ShootingStar => write!(f, "shooting_star"),
            PatternType::HangingMan => write!(f, "hanging_man"),
            PatternType::InvertedHammer => write!(f, "inverted_hammer"),
            PatternType::Hammer => write!(f, "hammer"),
        }
    }
}

/// Outcome of running the pattern rules against one candle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternResult {
    pub pattern: Option<PatternType>,
    pub confidence: f64,
    pub rejection_reasons: Vec<String>,
}

impl PatternResult {
    pub fn detected(pattern: PatternType, confidence: f64) -> Self {
        Self {
            pattern: Some(pattern),
            confidence,
            rejection_reasons: Vec::new(),
        }
    }

    pub fn rejected(reasons: Vec<String>) -> Self {
        Self {
            pattern: None,
            confidence: 0.0,
            rejection_reasons: reasons,
        }
    }
}

/// Qualitative trend bucket derived from the alignment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendStatus {
    StrongBullish,
    WeakBullish,
    Neutral,
    WeakBearish,
    StrongBearish,
}

impl TrendStatus {
    pub fn is_bullish(&self) -> bool {
        matches!(self, TrendStatus::StrongBullish | TrendStatus::WeakBullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, TrendStatus::StrongBearish | TrendStatus::WeakBearish)
    }
}

impl fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendStatus::StrongBullish => write!(f, "STRONG_BULLISH"),
            TrendStatus::WeakBullish => write!(f, "WEAK_BULLISH"),
            TrendStatus::Neutral => write!(f, "NEUTRAL"),
            TrendStatus::WeakBearish => write!(f, "WEAK_BEARISH"),
            TrendStatus::StrongBearish => write!(f, "STRONG_BEARISH"),
        }
    }
}

/// Trend context at one candle: signed alignment score, bucket, and the exact
/// relative ordering of price against the EMA stack (e.g. "P>20>30>50").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub score: i32,
    pub status: TrendStatus,
    pub alignment: String,
}

/// Which side of the volatility band the candle pierced, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BollingerZone {
    Peak,
    Bottom,
    None,
}

impl fmt::Display for BollingerZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BollingerZone::Peak => write!(f, "PEAK"),
            BollingerZone::Bottom => write!(f, "BOTTOM"),
            BollingerZone::None => write!(f, "NONE"),
        }
    }
}

/// Exhaustion evidence supporting a reversal signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExhaustionState {
    pub bollinger_zone: BollingerZone,
    pub candle_exhaustion: bool,
}

impl ExhaustionState {
    /// Whether the band piercing is on the side that supports a reversal in
    /// the given direction (a peak supports a bearish reversal, a bottom a
    /// bullish one).
    pub fn bollinger_supports(&self, direction: Direction) -> bool {
        match direction {
            Direction::Bearish => self.bollinger_zone == BollingerZone::Peak,
            Direction::Bullish => self.bollinger_zone == BollingerZone::Bottom,
        }
    }
}

/// Strength tier assigned by the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStrength {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalStrength::VeryHigh => write!(f, "VERY_HIGH"),
            SignalStrength::High => write!(f, "HIGH"),
            SignalStrength::Medium => write!(f, "MEDIUM"),
            SignalStrength::Low => write!(f, "LOW"),
            SignalStrength::VeryLow => write!(f, "VERY_LOW"),
        }
    }
}

/// Direction of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "BULLISH"),
            Direction::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// A qualifying reversal signal, created once per candle and immutable.
/// Consumed by the notification collaborator and archived by the persistence
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub timestamp: i64,
    pub source: String,
    pub symbol: String,
    pub pattern: PatternType,
    pub confidence: f64,
    pub trend: TrendAnalysis,
    pub exhaustion: ExhaustionState,
    pub strength: SignalStrength,
    pub direction: Direction,
}

/// Raw numeric inputs archived alongside a signal so the trend score can be
/// recomputed later with whatever scoring logic is current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInputs {
    pub close: f64,
    /// EMA value per period; `EMA_MISSING_SENTINEL` (or any non-finite value)
    /// marks a period that was unavailable when the record was written.
    pub emas: BTreeMap<u32, f64>,
}

impl RawInputs {
    /// Returns a usable EMA set only when every requested period is present
    /// and carries a real value. Missing periods are never defaulted to zero.
    pub fn valid_emas(&self, periods: &[u32]) -> Option<EmaSet> {
        let mut set = EmaSet::new();
        for period in periods {
            let value = *self.emas.get(period)?;
            // Prices are strictly positive, so the -1.0 sentinel and any other
            // non-positive value both read as "missing".
            if !value.is_finite() || value <= 0.0 {
                return None;
            }
            set.insert(*period, value);
        }
        Some(set)
    }
}

/// Realized outcome of a past signal, measured on the following candle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub expected_direction: Direction,
    pub actual_direction: Direction,
    pub success: bool,
    pub pnl: f64,
}

/// One archived (signal, outcome) pair. Append-only: records are written by a
/// sibling collaborator after the outcome candle closes and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub symbol: String,
    pub pattern: PatternType,
    pub confidence: f64,
    pub strength: SignalStrength,
    pub bollinger_zone: BollingerZone,
    pub candle_exhaustion: bool,
    #[serde(default)]
    pub raw_inputs: Option<RawInputs>,
    pub outcome: Outcome,
}

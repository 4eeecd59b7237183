// Export all necessary modules
pub mod config;
pub mod error;
pub mod exhaustion;
pub mod history;
pub mod indicators;
pub mod models;
pub mod patterns;
pub mod signal;
pub mod trend;

pub use config::EngineConfig;
pub use error::EngineError;
pub use history::{ProbabilityEngine, ProbabilityQuery, ProbabilityResponse};
pub use models::{Candle, Direction, PatternType, Signal, SignalStrength, TrendStatus};
pub use signal::{SignalClassifier, SignalEvaluator};

pub mod archive;
pub mod engine;
pub mod query;

pub use engine::{ProbabilityEngine, ScoredRecord};
pub use query::{ProbabilityQuery, ProbabilityResponse, TierStats};

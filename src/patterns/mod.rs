pub mod geometry;
pub mod reversal;

pub use geometry::CandleMetrics;
pub use reversal::PatternClassifier;

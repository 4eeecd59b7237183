use std::path::PathBuf;
use thiserror::Error;

/// Structural failures the library surfaces to the bootstrap layer. Everything
/// else (malformed archive lines, degenerate candles, missing EMA periods,
/// empty query results) is handled locally and never escapes as an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to read archive {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

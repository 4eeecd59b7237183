use crate::error::EngineError;
use crate::models::HistoricalRecord;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Reads the append-only archive: one self-contained JSON record per line.
///
/// Malformed lines are skipped with a warning and never abort the load. A
/// missing file loads as zero records, which is how structural persistence
/// failures surface to this core.
pub async fn load_records(path: impl AsRef<Path>) -> Result<Vec<HistoricalRecord>, EngineError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "archive file not found, loading zero records");
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .await
        .map_err(|source| EngineError::ArchiveRead {
            path: path.to_path_buf(),
            source,
        })?;

    let mut lines = BufReader::new(file).lines();
    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut line_no = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|source| EngineError::ArchiveRead {
            path: path.to_path_buf(),
            source,
        })?
    {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<HistoricalRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!(line = line_no, error = %e, "skipping malformed archive line");
            }
        }
    }

    info!(
        loaded = records.len(),
        skipped,
        path = %path.display(),
        "archive load complete"
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_archive(lines: &[&str]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("archive-{}.jsonl", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    const GOOD_LINE: &str = r#"{"timestamp":1700000000,"source":"mt5","symbol":"EURUSD","pattern":"HAMMER","confidence":0.8,"strength":"MEDIUM","bollinger_zone":"BOTTOM","candle_exhaustion":true,"raw_inputs":{"close":1.1,"emas":{"20":1.11,"50":1.12}},"outcome":{"expected_direction":"BULLISH","actual_direction":"BULLISH","success":true,"pnl":8.0}}"#;

    #[tokio::test]
    async fn malformed_lines_are_skipped_not_fatal() {
        let path = write_archive(&[GOOD_LINE, "not json at all", "{\"half\": true}", GOOD_LINE]);
        let records = load_records(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let path = write_archive(&[GOOD_LINE, "", "   "]);
        let records = load_records(&path).await.unwrap();
        assert_eq!(records.len(), 1);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn missing_archive_loads_zero_records() {
        let path = std::env::temp_dir().join("no-such-archive.jsonl");
        let records = load_records(&path).await.unwrap();
        assert!(records.is_empty());
    }
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::types::StatsRecord;

pub const DEFAULT_OUTPUT: &str = "stats.json";

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persists the records of one run.
pub trait ResultSink {
    fn save(&self, records: &[StatsRecord]) -> Result<(), SinkError>;
}

/// Writes records as a pretty-printed JSON array, replacing the file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ResultSink for JsonFileSink {
    fn save(&self, records: &[StatsRecord]) -> Result<(), SinkError> {
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush().map_err(|e| self.io_error(e))?;

        log::info!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record payload too short: expected {expected} bytes, got {actual}")]
    ShortPayload { expected: usize, actual: usize },

    #[error("Malformed store key '{key}': {reason}")]
    MalformedKey { key: String, reason: &'static str },

    #[error("Failed to open store at {}: {source}", path.display())]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to commit batch of {entries} entries: {source}")]
    StoreCommit {
        entries: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Store iteration failed: {0}")]
    StoreIteration(#[source] std::io::Error),

    #[error("Store is corrupt: {0}")]
    StoreCorrupt(String),

    #[error("Upstream fetch failed after {attempts} attempt(s): {message}")]
    UpstreamFetch { attempts: u32, message: String },

    #[error("CSV decode error at line {line}: {message}")]
    CsvDecode { line: u64, message: String },

    #[error("CSV encode error: {0}")]
    CsvEncode(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl ArchiveError {
    pub fn malformed_key(key: &[u8], reason: &'static str) -> Self {
        ArchiveError::MalformedKey {
            key: String::from_utf8_lossy(key).into_owned(),
            reason,
        }
    }

    pub fn csv_decode(line: u64, message: impl Into<String>) -> Self {
        ArchiveError::CsvDecode {
            line,
            message: message.into(),
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptStoreError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while reading line {line} in {path}: {source}")]
    IoLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON at {path}:{line}: {source}")]
    JsonLineParse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing transcript header line in {path}")]
    MissingHeader { path: PathBuf },

    #[error("line {line} in {path} must be a transcript header record")]
    InvalidHeaderRecord { path: PathBuf, line: usize },

    #[error("line {line} in {path} has unsupported transcript version {found}; expected 1")]
    UnsupportedVersion {
        path: PathBuf,
        line: usize,
        found: u32,
    },

    #[error("line {line} in {path} must be a turn record")]
    InvalidTurnRecord { path: PathBuf, line: usize },

    #[error("line {line} in {path} contains a duplicate turn id '{id}'")]
    DuplicateTurnId {
        path: PathBuf,
        line: usize,
        id: String,
    },

    #[error("line {line} in {path} has invalid RFC3339 timestamp in field '{field}': {value}")]
    InvalidTimestamp {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("stored image block is not valid base64: {source}")]
    InvalidImageData {
        #[source]
        source: base64::DecodeError,
    },

    #[error("failed to serialize transcript line for {path}: {source}")]
    JsonSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),

    #[error("a turn is already open; seal or discard it before beginning another")]
    TurnAlreadyOpen,

    #[error("no turn is open; call begin_turn first")]
    NoOpenTurn,
}

impl TranscriptStoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn io_line(path: impl Into<PathBuf>, line: usize, source: std::io::Error) -> Self {
        Self::IoLine {
            path: path.into(),
            line,
            source,
        }
    }

    #[must_use]
    pub fn json_line(path: impl Into<PathBuf>, line: usize, source: serde_json::Error) -> Self {
        Self::JsonLineParse {
            path: path.into(),
            line,
            source,
        }
    }

    #[must_use]
    pub fn json_serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::JsonSerialize {
            path: path.into(),
            source,
        }
    }
}

//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

/// A stage failure. Stages log these with context and hand them back unchanged;
/// nothing in the pipeline retries.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed source: {0}")]
    MalformedSource(String),

    #[error("Empty input: no records to transform")]
    EmptyInput,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl PipelineError {
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn malformed_source(msg: impl Into<String>) -> Self {
        Self::MalformedSource(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Stable name of the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "SourceUnavailable",
            Self::MalformedSource(_) => "MalformedSource",
            Self::EmptyInput => "EmptyInput",
            Self::InvalidTimestamp(_) => "InvalidTimestamp",
            Self::Storage(_) => "StorageError",
            Self::Export(_) => "ExportError",
        }
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(format!("sqlite: {e}"))
    }
}

impl From<tokio_postgres::Error> for PipelineError {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Storage(format!("postgres: {e}"))
    }
}

//! Error type shared by the loader, the pipeline and the CLI.

use std::path::PathBuf;

/// Everything that can go wrong while loading or analyzing card records.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Reading or writing a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON payload or JSONL line could not be parsed or written.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV input or output failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A raw record carried a timestamp none of the accepted layouts match.
    #[error("invalid transaction timestamp '{value}'")]
    InvalidTimestamp { value: String },

    /// The input file extension is not one the loader understands.
    #[error("unsupported input format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
}

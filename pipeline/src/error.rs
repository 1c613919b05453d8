//! Error types for the review pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline run.
///
/// Locator failures never appear here; they degrade to whole-paragraph
/// comments.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Document error.
    #[error("document error: {0}")]
    Docx(#[from] redline_docx::DocxError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

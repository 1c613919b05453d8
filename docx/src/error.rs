//! Error types for package reading, reconstruction and comment injection.

use thiserror::Error;

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, DocxError>;

/// Errors that abort work on a whole document.
#[derive(Error, Debug)]
pub enum DocxError {
    /// The archive is unreadable or corrupt.
    #[error("package error: {0}")]
    Package(#[from] zip::result::ZipError),

    /// A mandatory part is missing from the package.
    #[error("missing mandatory part: {0}")]
    MissingPart(String),

    /// A part could not be parsed as markup, or lacks its mandatory structure.
    #[error("malformed markup in {part}: {message}")]
    MalformedMarkup {
        /// Name of the offending part.
        part: String,
        /// Parser diagnostic.
        message: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid annotation marker pattern.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex_lite::Error),
}

impl DocxError {
    pub(crate) fn malformed(part: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedMarkup {
            part: part.into(),
            message: message.to_string(),
        }
    }
}

/// Failure to inject a single annotation.
///
/// These never abort an injection run; the annotation is skipped and the
/// reason is recorded in the report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectionError {
    /// The annotation addresses a paragraph the document does not have.
    #[error("paragraph {index} out of range ({count} paragraphs)")]
    ParagraphOutOfRange { index: usize, count: usize },

    /// The paragraph has no runs to anchor a comment on.
    #[error("paragraph {0} has no runs")]
    NoRuns(usize),
}

//! Error types for PDF output.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling a PDF document.
#[derive(Error, Debug)]
pub enum Error {
    /// lopdf failed to encode content or serialize the document.
    #[error("PDF encoding failed: {0}")]
    Encode(#[from] lopdf::Error),

    /// Writing the serialized document failed.
    #[error("Failed to write PDF: {0}")]
    IoError(#[from] std::io::Error),

    /// A font file could not be read or is not an embeddable TrueType font.
    #[error("Failed to load font {name}: {reason}")]
    Font { name: String, reason: String },
}

impl Error {
    pub(crate) fn font(name: impl ToString, reason: impl ToString) -> Self {
        Error::Font {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

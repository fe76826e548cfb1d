/*!
 * Error types for the podwright application.
 *
 * This module contains custom error types for the different pipeline stages,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when calling the speech-synthesis provider
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// Error when sending the synthesis request fails at the transport level
    #[error("Synthesis request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing the provider response fails
    #[error("Failed to parse synthesis response: {0}")]
    ParseError(String),

    /// Error returned by the provider itself
    #[error("Provider responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the provider
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl SynthesisError {
    /// Whether this failure is worth retrying.
    ///
    /// Transport failures, timeouts and 5xx responses are transient and get
    /// retried with backoff; 4xx responses and auth failures are permanent
    /// and skipped immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors that can occur while splitting a narration document into segments
#[derive(Error, Debug)]
pub enum SegmentationError {
    /// The document cannot be bounded under the chunk limit without
    /// breaking well-formedness
    #[error("Cannot split content under {max_chars} chars: {reason}")]
    UnsplittableContent {
        /// The configured per-request character budget
        max_chars: usize,
        /// Why the split is impossible
        reason: String,
    },

    /// The markup document is not well-formed to begin with
    #[error("Malformed markup: {0}")]
    MalformedMarkup(String),
}

/// Errors that can occur while mixing narration with the music bed
#[derive(Error, Debug)]
pub enum MixingError {
    /// Crossfade/loop length invariant violated; aborts before a master
    /// is produced rather than silently clamping
    #[error("Mixing invariant violated: {0}")]
    InvariantViolated(String),

    /// An input buffer is unusable (empty, bad sample rate)
    #[error("Invalid audio input: {0}")]
    InvalidInput(String),

    /// Decoding an audio asset failed
    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),
}

/// Errors that can occur while tagging the final episode file.
/// These are recoverable: the already-produced audio is never discarded.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The cover image could not be read
    #[error("Failed to read cover image: {0}")]
    CoverUnreadable(String),

    /// Writing the tag to the file failed
    #[error("Failed to write tags: {0}")]
    TagWriteFailed(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the synthesis provider
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Error from document segmentation
    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    /// Error from audio mixing
    #[error("Mixing error: {0}")]
    Mixing(#[from] MixingError),

    /// Error from episode tagging
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

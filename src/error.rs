//! Error types for image generation and editing.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum length of an upstream error body carried in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// A failed precondition, detected before any remote call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Precondition {
    /// Text-to-image generation needs a prompt.
    #[error("Please enter a prompt.")]
    MissingPrompt,
    /// Editing needs a prompt describing the change.
    #[error("Please enter a prompt describing how to edit the image.")]
    MissingEditPrompt,
    /// Image operations need a loaded source image.
    #[error("Please upload a source image.")]
    MissingSourceImage,
}

/// Errors that can occur while producing images.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// The local image resource could not be read.
    #[error("failed to read image resource {}: {source}", .path.display())]
    ResourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The edit endpoint answered without an inline image part.
    #[error("no image data found in the response")]
    NoImageInResponse,

    /// Text-to-image generation failed.
    #[error("Could not generate images from the prompt.")]
    Generation(#[source] Box<StudioError>),

    /// Prompt-guided editing failed.
    #[error("Could not edit the image with the prompt.")]
    Edit(#[source] Box<StudioError>),

    /// Background removal failed.
    #[error("Could not remove the image background.")]
    BackgroundRemoval(#[source] Box<StudioError>),

    /// Enhancement failed.
    #[error("Could not enhance the image.")]
    Enhance(#[source] Box<StudioError>),

    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The API answered with a body we could not use.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, StudioError>;

/// Trims an upstream error body to one line of bounded length.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "empty error response".to_string();
    }
    if collapsed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    format!("{truncated}...")
}

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

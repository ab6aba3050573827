use thiserror::Error;

/// Errors surfaced at the submission boundary. None of these are fatal to
/// the process; the user may fix the cause and resubmit.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The API credential is missing. Raised before any network call.
    #[error("{0}")]
    Configuration(String),

    /// The uploaded bytes could not be decoded as a PNG or JPEG image.
    #[error("could not read the image: {0}")]
    Decode(String),

    /// The chat-completion endpoint returned a non-success status, or the
    /// request failed in transit. `status` is absent for transport errors.
    #[error("chat completion request failed: {detail}")]
    Http { status: Option<u16>, detail: String },

    /// The response envelope was missing the fields we expect.
    #[error("unexpected response from the model: {0}")]
    Parse(String),
}

impl From<image::ImageError> for AnalysisError {
    fn from(err: image::ImageError) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        AnalysisError::Http {
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    }
}

//! Error types for image classification

/// Result type for classification operations
pub type ClassifyResult<T> = std::result::Result<T, ClassificationError>;

/// Errors that can occur while classifying an incident image.
///
/// The classifier itself only returns [`ClassificationError::MissingInput`];
/// everything after that is folded into a degraded record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassificationError {
    /// Provider credential is absent. Raised by the HTTP route when it is set
    /// to refuse unconfigured requests; the classifier reports
    /// `ClassificationOutcome::NotConfigured` instead.
    #[error("Image analysis service is not configured")]
    ServiceNotConfigured,

    /// No image supplied
    #[error("No image provided")]
    MissingInput,

    /// Image present but implausible
    #[error("Invalid image data: {0}")]
    InvalidInput(String),

    /// Transport error talking to the provider
    #[error("Upstream request failed: {0}")]
    UpstreamRequestFailed(String),

    /// Provider answered with a non-success status
    #[error("Upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Provider did not answer within the configured timeout
    #[error("Upstream request timed out after {0} seconds")]
    UpstreamTimeout(u64),

    /// Success status but no usable `choices[0].message.content`
    #[error("Upstream response malformed: {0}")]
    UpstreamResponseMalformed(String),

    /// Neither JSON nor label extraction produced usable fields
    #[error("Failed to parse model output: {0}")]
    ParseFailure(String),
}

impl ClassificationError {
    /// Whether a second attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClassificationError::UpstreamRequestFailed(_) | ClassificationError::UpstreamTimeout(_) => {
                true
            }
            ClassificationError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClassificationError::ServiceNotConfigured => "service_not_configured",
            ClassificationError::MissingInput => "missing_input",
            ClassificationError::InvalidInput(_) => "invalid_input",
            ClassificationError::UpstreamRequestFailed(_) => "upstream_request_failed",
            ClassificationError::UpstreamStatus { .. } => "upstream_status",
            ClassificationError::UpstreamTimeout(_) => "upstream_timeout",
            ClassificationError::UpstreamResponseMalformed(_) => "upstream_response_malformed",
            ClassificationError::ParseFailure(_) => "parse_failure",
        }
    }
}

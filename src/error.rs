use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstafyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Malformed caller input. The message is shown to the caller verbatim.
    #[error("{0}")]
    ValidationError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    /// Non-success status from a remote endpoint, with the raw body text.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("No image returned from Gemini")]
    NoImageReturned,
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Shown to the user as reported by the remover.
    #[error("{0}")]
    BackgroundRemovalError(String),
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Raised by pipeline steps; carries the message to surface to the user.
    #[error("{0}")]
    PipelineError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl InstafyError {
    /// HTTP status the gateway answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            InstafyError::ValidationError(_) => 400,
            InstafyError::PayloadTooLarge { .. } => 413,
            _ => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<serde_json::Error> for InstafyError {
    fn from(e: serde_json::Error) -> Self {
        InstafyError::SerializationError(e.to_string())
    }
}

impl From<reqwest::Error> for InstafyError {
    fn from(e: reqwest::Error) -> Self {
        InstafyError::RequestError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InstafyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_message_carries_code_and_body() {
        let err = InstafyError::HttpStatus {
            status: 403,
            body: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 403: permission denied");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_validation_errors_are_client_errors() {
        let err = InstafyError::ValidationError("Missing prompt".into());
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Missing prompt");
        assert!(!InstafyError::NoImageReturned.is_client_error());
    }

    #[test]
    fn test_oversized_body_is_client_error() {
        let err = InstafyError::PayloadTooLarge { limit: 64 };
        assert_eq!(err.status_code(), 413);
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Request body exceeds 64 bytes");
    }

    #[test]
    fn test_background_removal_message_is_unprefixed() {
        let err = InstafyError::BackgroundRemovalError("model crashed".into());
        assert_eq!(err.to_string(), "model crashed");
        assert_eq!(err.status_code(), 500);
    }
}

//! # OCR Error Types Module
//!
//! Error types raised while acquiring receipt text from an OCR backend.

/// Errors raised by OCR backends and the acquisition policy
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// Image failed validation (missing, empty, too large, unknown format)
    Validation(String),
    /// Cloud credentials are absent
    MissingCredentials,
    /// Cloud credentials are malformed
    InvalidCredentials(String),
    /// OCR engine could not be initialized
    Initialization(String),
    /// Image could not be read or loaded into the engine
    ImageLoad(String),
    /// Engine failed while recognizing text
    Extraction(String),
    /// Cloud service answered with a non-success status
    Http { status: u16, message: String },
    /// Cloud request could not be sent or completed
    Request(String),
    /// Cloud response could not be understood
    MalformedResponse(String),
    /// Backend did not answer within the configured number of seconds
    Timeout(u64),
    /// Caller cancelled the acquisition
    Cancelled,
}

impl OcrError {
    /// Failures of the cloud call itself, as opposed to local or input errors
    pub fn is_cloud_failure(&self) -> bool {
        matches!(
            self,
            OcrError::Http { .. }
                | OcrError::Request(_)
                | OcrError::MalformedResponse(_)
                | OcrError::Timeout(_)
        )
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Validation(msg) => write!(f, "Validation error: {msg}"),
            OcrError::MissingCredentials => write!(f, "Credential error: no API key configured"),
            OcrError::InvalidCredentials(msg) => write!(f, "Credential error: {msg}"),
            OcrError::Initialization(msg) => write!(f, "Initialization error: {msg}"),
            OcrError::ImageLoad(msg) => write!(f, "Image load error: {msg}"),
            OcrError::Extraction(msg) => write!(f, "Extraction error: {msg}"),
            OcrError::Http { status, message } => write!(f, "HTTP error {status}: {message}"),
            OcrError::Request(msg) => write!(f, "Request error: {msg}"),
            OcrError::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
            OcrError::Timeout(secs) => write!(f, "Timeout error: no answer after {secs}s"),
            OcrError::Cancelled => write!(f, "OCR acquisition cancelled"),
        }
    }
}

impl std::error::Error for OcrError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            OcrError::Http {
                status: 403,
                message: "forbidden".to_string()
            }
            .to_string(),
            "HTTP error 403: forbidden"
        );
        assert_eq!(OcrError::Timeout(30).to_string(), "Timeout error: no answer after 30s");
    }

    #[test]
    fn test_cloud_failure_classification() {
        assert!(OcrError::Timeout(5).is_cloud_failure());
        assert!(OcrError::MalformedResponse("empty".into()).is_cloud_failure());
        assert!(!OcrError::MissingCredentials.is_cloud_failure());
        assert!(!OcrError::Initialization("no tessdata".into()).is_cloud_failure());
    }
}

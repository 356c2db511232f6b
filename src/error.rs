//! Error types surfaced by a masking session
//!
//! Every failure ends up as one user-visible message. Remote failures prefer
//! the structured `detail` the service sent, then the transport message,
//! then a generic fallback.

use thiserror::Error;

/// Shown when an upload fails without any usable message
pub const UPLOAD_FALLBACK: &str = "Failed to upload file";

/// Shown when a mask request fails without any usable message
pub const MASK_FALLBACK: &str = "Failed to mask PII";

/// Local precondition failures of a mask request. These never reach the
/// network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter or upload text to mask")]
    NoText,
    #[error("Please select at least one PII category")]
    NoActiveCategory,
}

/// Failure reported by a remote collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    /// Transport or protocol level description
    pub message: String,
    /// Structured detail supplied by the service, if any
    pub detail: Option<String>,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            status: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// The message to show the user: detail, else message, else `fallback`.
    pub fn user_message_or(&self, fallback: &str) -> String {
        if let Some(detail) = self.detail.as_deref().filter(|d| !d.trim().is_empty()) {
            return detail.to_string();
        }
        if !self.message.trim().is_empty() {
            return self.message.clone();
        }
        fallback.to_string()
    }
}

/// What a session reports to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("upload failed: {0}")]
    Upload(ServiceError),
    #[error("masking failed: {0}")]
    Mask(ServiceError),
}

impl SessionError {
    /// Single line suitable for the error banner
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Upload(e) => e.user_message_or(UPLOAD_FALLBACK),
            Self::Mask(e) => e.user_message_or(MASK_FALLBACK),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_preferred_over_message() {
        let err = ServiceError::new("Request failed with status 400")
            .with_status(400)
            .with_detail("Unsupported file type: .exe");
        assert_eq!(err.user_message_or(UPLOAD_FALLBACK), "Unsupported file type: .exe");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn test_message_when_no_detail() {
        let err = ServiceError::new("connection refused");
        assert_eq!(err.user_message_or(MASK_FALLBACK), "connection refused");
    }

    #[test]
    fn test_fallback_when_empty() {
        let err = ServiceError::new("").with_detail("   ");
        assert_eq!(
            SessionError::Mask(err.clone()).user_message(),
            MASK_FALLBACK
        );
        assert_eq!(SessionError::Upload(err).user_message(), UPLOAD_FALLBACK);
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            SessionError::from(ValidationError::NoText).user_message(),
            "Please enter or upload text to mask"
        );
        assert_eq!(
            SessionError::from(ValidationError::NoActiveCategory).user_message(),
            "Please select at least one PII category"
        );
        assert!(SessionError::from(ValidationError::NoText).is_validation());
    }
}

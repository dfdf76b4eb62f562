//! Site error taxonomy
//!
//! Client input errors become JSON `{error}` bodies; internal failures are
//! caught by the dispatcher and answered with the 500 page.

use hyper::StatusCode;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("No file selected")]
    NoFile,

    #[error("{0}")]
    BadRequest(String),

    #[error("File too large")]
    PayloadTooLarge,

    #[error("{0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire shape of a client error
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl SiteError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NoFile | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this failure is recovered by the dispatcher's 500 page
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Io(_))
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SiteError::NoFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SiteError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SiteError::PayloadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert!(SiteError::Internal("boom".into()).is_internal());
        assert!(!SiteError::NoFile.is_internal());
    }

    #[test]
    fn test_error_body() {
        let body = serde_json::to_value(SiteError::NoFile.body()).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "No file selected" }));
    }
}

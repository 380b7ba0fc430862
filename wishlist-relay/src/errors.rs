use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while relaying a wishlist request
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("Invalid or missing secret")]
    InvalidSecret,

    #[error("Origin not allowed: {0}")]
    OriginNotAllowed(String),

    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },

    #[error("Upstream request failed: {0}")]
    UpstreamRequestFailed(String),

    #[error("Upstream timeout after {0}s")]
    UpstreamTimeout(u64),

    #[error("Invalid upstream response body: {0}")]
    UpstreamBody(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingField(_) | RelayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RelayError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::InvalidSecret | RelayError::OriginNotAllowed(_) => StatusCode::FORBIDDEN,
            RelayError::UpstreamStatus { .. }
            | RelayError::UpstreamRequestFailed(_)
            | RelayError::UpstreamTimeout(_)
            | RelayError::UpstreamBody(_)
            | RelayError::Internal(_)
            | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RelayError::UpstreamStatus { .. }
                | RelayError::UpstreamRequestFailed(_)
                | RelayError::UpstreamTimeout(_)
                | RelayError::UpstreamBody(_)
        )
    }

    /// Message safe to return to the caller.
    ///
    /// Upstream details stay in the logs, `upstream_message` replaces them.
    pub fn public_message(&self, upstream_message: &'static str) -> String {
        match self {
            RelayError::MissingField(field) => format!("Missing {field}"),
            RelayError::InvalidBody(_) => "Invalid request body".to_string(),
            RelayError::BodyTooLarge(_) => "Request body too large".to_string(),
            RelayError::InvalidSecret => "Forbidden - invalid secret".to_string(),
            RelayError::OriginNotAllowed(_) => "Origin not allowed".to_string(),
            e if e.is_upstream() => upstream_message.to_string(),
            _ => "Server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_details_are_not_public() {
        let err = RelayError::UpstreamStatus {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: r#"{"errors":"token rejected"}"#.to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.public_message("Failed to read metafields"),
            "Failed to read metafields"
        );
        assert!(err.to_string().contains("token rejected"));
    }

    #[test]
    fn test_client_errors() {
        let err = RelayError::MissingField("customer_id");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message("unused"), "Missing customer_id");

        let err = RelayError::InvalidSecret;
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.public_message("unused"), "Forbidden - invalid secret");

        let err = RelayError::Internal("boom".to_string());
        assert_eq!(err.public_message("unused"), "Server error");
    }
}

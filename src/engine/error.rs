//! Request error taxonomy
//!
//! Every failure raised inside the request pipeline is one of these kinds.
//! The governor converts them to HTTP status codes and JSON error bodies at
//! its boundary; nothing propagates further.

use hyper::StatusCode;
use thiserror::Error;

/// Failures raised while routing, decoding, or invoking a handler.
#[derive(Debug, Error)]
pub enum RouteError {
    /// No handler file or route pattern matches the request path.
    #[error("no API route matches the requested path")]
    RouteNotFound,

    /// The resolved file path escapes the configured API root.
    #[error("access to the requested path is denied")]
    ForbiddenPath,

    /// The request body exceeded the configured size limit mid-stream.
    #[error("request body exceeds the configured limit")]
    BodyTooLarge,

    /// The request payload is not parseable JSON.
    #[error("Invalid JSON body: {0}")]
    InvalidJsonBody(String),

    /// The handler script defines no `handler` function.
    #[error("handler script does not define a handler function")]
    NoHandlerExport,

    /// The handler script failed to load, compile, or run.
    #[error("{0}")]
    Handler(String),

    /// The response was not produced within the configured timeout.
    #[error("request timed out")]
    Timeout,
}

impl RouteError {
    /// HTTP status code this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::ForbiddenPath => StatusCode::FORBIDDEN,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidJsonBody(_) => StatusCode::BAD_REQUEST,
            Self::NoHandlerExport | Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RouteError::RouteNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(RouteError::ForbiddenPath.status(), StatusCode::FORBIDDEN);
        assert_eq!(RouteError::BodyTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            RouteError::InvalidJsonBody("eof".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RouteError::NoHandlerExport.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(RouteError::Timeout.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_invalid_json_message_prefix() {
        let err = RouteError::InvalidJsonBody("expected value at line 1".to_string());
        assert!(err.to_string().starts_with("Invalid JSON body"));
    }
}

//! Auth gate rejections.
//!
//! Every rejection answers with a redirect to the landing page; the code is
//! kept for logs so the reason is not lost.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Where rejected requests are sent
pub const LOGIN_REDIRECT: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// No Authorization header
    MissingToken,
    /// Header present but not `Bearer <token>`
    InvalidFormat,
    /// Bad signature or expired
    InvalidToken,
    /// Token subject does not match the user the request acts for
    SubjectMismatch,
}

impl AuthErrorCode {
    pub fn name(self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::SubjectMismatch => "SUBJECT_MISMATCH",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {}", .code.name(), .message)]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_code(code: AuthErrorCode) -> Self {
        let message = match code {
            AuthErrorCode::MissingToken => "Missing Authorization header",
            AuthErrorCode::InvalidFormat => "Invalid Authorization header format",
            AuthErrorCode::InvalidToken => "Invalid or expired token",
            AuthErrorCode::SubjectMismatch => "Token does not belong to this user",
        };
        Self::new(code, message)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(code = self.code.name(), "Unauthorized: {}", self.message);
        (StatusCode::FOUND, [(header::LOCATION, LOGIN_REDIRECT)]).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_code() {
        let err = AuthError::from_code(AuthErrorCode::InvalidToken);
        assert_eq!(err.code, AuthErrorCode::InvalidToken);
        assert!(err.message.contains("expired"));
        assert_eq!(err.to_string(), "INVALID_TOKEN: Invalid or expired token");
    }

    #[test]
    fn test_rejection_redirects_home() {
        let resp = AuthError::from_code(AuthErrorCode::MissingToken).into_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "/");
    }
}

use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// The OAuth 2.0 error code carried by an [`OAuthError`].
///
/// The string form is what goes on the wire in the `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccessDenied,
    InsufficientScope,
    InvalidArgument,
    InvalidClient,
    InvalidGrant,
    InvalidRequest,
    InvalidScope,
    InvalidToken,
    ServerError,
    UnauthorizedClient,
    UnauthorizedRequest,
    UnsupportedGrantType,
    UnsupportedResponseType,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::InsufficientScope => "insufficient_scope",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InvalidClient => "invalid_client",
            ErrorKind::InvalidGrant => "invalid_grant",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidScope => "invalid_scope",
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::ServerError => "server_error",
            ErrorKind::UnauthorizedClient => "unauthorized_client",
            ErrorKind::UnauthorizedRequest => "unauthorized_request",
            ErrorKind::UnsupportedGrantType => "unsupported_grant_type",
            ErrorKind::UnsupportedResponseType => "unsupported_response_type",
        }
    }

    /// HTTP status used when the error is created without an explicit one
    pub fn default_status(&self) -> StatusCode {
        match self {
            ErrorKind::InsufficientScope => StatusCode::FORBIDDEN,
            ErrorKind::InvalidArgument => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::InvalidToken | ErrorKind::UnauthorizedRequest => StatusCode::UNAUTHORIZED,
            ErrorKind::ServerError => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by an engine (or by a model it calls) while handling a request.
///
/// `kind` and `message` map to the `error` and `error_description` fields of
/// an OAuth 2.0 error response; `status` is the HTTP status to send.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct OAuthError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: StatusCode,
}

impl OAuthError {
    /// Create an error of the given kind with its default HTTP status
    pub fn new<S: ToString>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.to_string(),
            status: kind.default_status(),
        }
    }

    /// Override the HTTP status
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Wire name of the error (the `error` field)
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn access_denied<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    pub fn insufficient_scope<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::InsufficientScope, message)
    }

    pub fn invalid_argument<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn invalid_client<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::InvalidClient, message)
    }

    pub fn invalid_grant<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::InvalidGrant, message)
    }

    pub fn invalid_request<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn invalid_scope<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::InvalidScope, message)
    }

    pub fn invalid_token<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::InvalidToken, message)
    }

    pub fn server_error<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    pub fn unauthorized_client<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::UnauthorizedClient, message)
    }

    pub fn unauthorized_request<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::UnauthorizedRequest, message)
    }

    pub fn unsupported_grant_type<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::UnsupportedGrantType, message)
    }

    pub fn unsupported_response_type<S: ToString>(message: S) -> Self {
        Self::new(ErrorKind::UnsupportedResponseType, message)
    }

    /// Missing required request parameter, e.g. ``Missing parameter: `grant_type` ``
    pub fn missing_parameter(name: &str) -> Self {
        Self::invalid_request(format!("Missing parameter: `{}`", name))
    }

    /// A model capability the engine needs is not provided
    pub fn not_implemented(capability: &str) -> Self {
        Self::invalid_argument(format!(
            "Invalid argument: model does not implement `{}()`",
            capability
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_statuses() {
        assert_eq!(
            OAuthError::invalid_request("x").status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OAuthError::invalid_token("x").status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            OAuthError::insufficient_scope("x").status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            OAuthError::invalid_argument("x").status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            OAuthError::server_error("x").status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_missing_parameter_message() {
        let error = OAuthError::missing_parameter("response_type");
        assert_eq!(error.name(), "invalid_request");
        assert_eq!(error.to_string(), "Missing parameter: `response_type`");
    }

    #[test]
    fn test_not_implemented_names_capability() {
        let error = OAuthError::not_implemented("get_access_token");
        assert_eq!(error.kind, ErrorKind::InvalidArgument);
        assert!(error.message.contains("`get_access_token()`"));
    }

    #[test]
    fn test_with_status() {
        let error = OAuthError::invalid_client("bad").with_status(StatusCode::UNAUTHORIZED);
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.name(), "invalid_client");
    }
}

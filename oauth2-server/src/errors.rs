use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use oauth2_engine::{ErrorKind, OAuthError, Response as EngineResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that stop the demo server from starting or serving
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] confique::Error),
    #[error("Failed to create OAuth2 server: {0}")]
    Setup(#[from] OAuthError),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON body of an error rendered by the adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: String,
}

impl From<&OAuthError> for ErrorBody {
    fn from(error: &OAuthError) -> Self {
        Self {
            error: error.name().to_string(),
            error_description: error.message.clone(),
        }
    }
}

/// Renders an engine error as the final response.
///
/// Headers the engine wrote (e.g. `WWW-Authenticate`) are kept. An
/// `unauthorized_request` gets an empty body.
pub(crate) fn render_error(error: &OAuthError, response: EngineResponse) -> Response {
    let mut rendered = match error.kind {
        ErrorKind::UnauthorizedRequest => Body::empty().into_response(),
        _ => Json(ErrorBody::from(error)).into_response(),
    };
    *rendered.status_mut() = error.status;
    rendered.headers_mut().extend(response.headers);
    rendered
}

/// Hands an error to whatever error handling layer wraps the route.
///
/// The response carries the error in its extensions; read it back with
/// [`raised_error`].
pub(crate) fn raise_error(error: OAuthError, headers: HeaderMap) -> Response {
    let mut raised = Response::new(Body::from(error.message.clone()));
    *raised.status_mut() = error.status;
    raised.headers_mut().extend(headers);
    raised.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    raised.extensions_mut().insert(error);
    raised
}

/// The error raised by the adapter for this response, if any
pub fn raised_error(response: &Response) -> Option<&OAuthError> {
    response.extensions().get::<OAuthError>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::WWW_AUTHENTICATE;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn body_bytes(response: Response) -> axum::body::Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_render_error_json_body() {
        let error = OAuthError::invalid_grant("Invalid grant: user credentials are invalid");
        let response = render_error(&error, EngineResponse::new());

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(raised_error(&response).is_none());
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            body,
            json!({
                "error": "invalid_grant",
                "error_description": "Invalid grant: user credentials are invalid"
            })
        );
    }

    #[tokio::test]
    async fn test_render_unauthorized_request_is_empty() {
        let mut engine = EngineResponse::new();
        engine.set_header(WWW_AUTHENTICATE, "Bearer realm=\"Service\"");
        let error = OAuthError::unauthorized_request("Unauthorized request: no authentication given");

        let response = render_error(&error, engine);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[WWW_AUTHENTICATE],
            "Bearer realm=\"Service\""
        );
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_raise_error_carries_the_error() {
        let error = OAuthError::insufficient_scope("Insufficient scope: authorized scope is insufficient");
        let response = raise_error(error.clone(), HeaderMap::new());

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(raised_error(&response), Some(&error));
        assert_eq!(
            &body_bytes(response).await[..],
            b"Insufficient scope: authorized scope is insufficient"
        );
    }
}

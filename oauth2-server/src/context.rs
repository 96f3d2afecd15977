//! Translation between axum requests/responses and the engine's value objects.

use axum::{
    body::{Body, HttpBody},
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, warn};
use oauth2_engine::{
    AuthorizationCode, OAuthError, Request as EngineRequest, Response as EngineResponse, Token,
};
use serde_json::Value;
use std::collections::HashMap;

/// Request-scoped OAuth results, stored in the request extensions.
///
/// Downstream handlers read it with `Extension<OAuthState>`.
#[derive(Debug, Clone, Default)]
pub struct OAuthState {
    /// Set by `authenticate` and `token`
    pub token: Option<Token>,
    /// Set by `authorize`
    pub code: Option<AuthorizationCode>,
}

/// Body parameters parsed by an upstream layer.
///
/// When present in the request extensions the adapter uses it instead of
/// reading the body itself.
#[derive(Debug, Clone, Default)]
pub struct ParsedBody(pub HashMap<String, String>);

/// How an operation treats the request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyPolicy {
    /// Read and parse any body; unreadable or malformed bodies are errors
    Strict,
    /// Read only a form body of known length within the limit. Anything else
    /// carries no parameters and is passed on untouched.
    FormOnly,
}

/// Splits an axum request into the engine's view of it and the request to
/// hand on down the chain. A body that was read is put back.
pub(crate) async fn engine_request(
    request: Request,
    body_limit: usize,
    policy: BodyPolicy,
) -> Result<(Request, EngineRequest), OAuthError> {
    let (parts, body) = request.into_parts();

    let query = parts
        .uri
        .query()
        .map(|query| parse_form(query.as_bytes()))
        .unwrap_or_default();

    let (params, body) = match parts.extensions.get::<ParsedBody>() {
        Some(parsed) => (parsed.0.clone(), body),
        None if policy == BodyPolicy::FormOnly => {
            read_form_body(&parts.headers, body, body_limit).await
        }
        None => {
            let bytes = axum::body::to_bytes(body, body_limit).await.map_err(|e| {
                warn!("Failed to read request body: {}", e);
                OAuthError::invalid_request("Invalid request: request body could not be read")
            })?;
            let params = parse_body(&parts.headers, &bytes)?;
            (params, Body::from(bytes))
        }
    };

    debug!(
        "Translated {} {} with {} query and {} body parameters",
        parts.method,
        parts.uri.path(),
        query.len(),
        params.len()
    );

    let engine_request = EngineRequest::new(parts.method.clone(), parts.uri.path())
        .with_query(query)
        .with_headers(parts.headers.clone())
        .with_body(params);

    Ok((Request::from_parts(parts, body), engine_request))
}

async fn read_form_body(
    headers: &HeaderMap,
    body: Body,
    body_limit: usize,
) -> (HashMap<String, String>, Body) {
    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    let within_limit = body
        .size_hint()
        .exact()
        .is_some_and(|len| len <= body_limit as u64);
    if !is_form || !within_limit {
        return (HashMap::new(), body);
    }

    match axum::body::to_bytes(body, body_limit).await {
        Ok(bytes) => (parse_form(&bytes), Body::from(bytes)),
        Err(e) => {
            warn!("Failed to read form body: {}", e);
            (HashMap::new(), Body::empty())
        }
    }
}

/// Parses a JSON object body or a form-encoded body into string parameters
fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> Result<HashMap<String, String>, OAuthError> {
    if bytes.is_empty() {
        return Ok(HashMap::new());
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") {
        let object: serde_json::Map<String, Value> = serde_json::from_slice(bytes)
            .map_err(|_| OAuthError::invalid_request("Invalid request: malformed request body"))?;
        Ok(object
            .into_iter()
            .map(|(key, value)| (key, stringify(value)))
            .collect())
    } else {
        Ok(parse_form(bytes))
    }
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_form(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input).into_owned().collect()
}

/// Copies an engine response (status, headers, JSON body) onto an axum response
pub(crate) fn into_http_response(response: EngineResponse) -> Response {
    let mut http_response = match response.body {
        Some(body) => Json(body).into_response(),
        None => Body::empty().into_response(),
    };
    *http_response.status_mut() = response.status;
    http_response.headers_mut().extend(response.headers);
    http_response
}

/// Adds engine headers to a response produced further down the chain,
/// leaving headers the downstream handler already set alone
pub(crate) fn apply_headers(headers: &HeaderMap, response: &mut Response) {
    for name in headers.keys() {
        if response.headers().contains_key(name) {
            continue;
        }
        for value in headers.get_all(name) {
            response.headers_mut().append(name.clone(), value.clone());
        }
    }
}

//! Framework-independent request and response value objects.
//!
//! Adapters build a [`Request`] from whatever their web framework hands them,
//! pass it to the engine together with a fresh [`Response`], and copy the
//! response back afterwards.

use http::header::{HeaderName, LOCATION};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::collections::HashMap;

/// Inbound request as seen by an engine
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    /// Already-parsed body parameters
    pub body: HashMap<String, String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: HashMap::new(),
        }
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: HashMap<String, String>) -> Self {
        self.body = body;
        self
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Looks a parameter up in the body first, then in the query string.
    /// Empty values count as missing.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.body
            .get(name)
            .or_else(|| self.query.get(name))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Outbound response filled in by an engine
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, `None` for an empty body
    pub body: Option<serde_json::Value>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, ignoring values that are not valid header text
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(e) => log::warn!("Dropping invalid value for header {}: {}", name, e),
        }
    }

    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Turns the response into a `302 Found` redirect to `location`
    pub fn redirect(&mut self, location: &str) {
        self.set_header(LOCATION, location);
        self.status = StatusCode::FOUND;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_param_prefers_body() {
        let request = Request::new(Method::POST, "/token")
            .with_query(params(&[("scope", "query"), ("state", "xyz")]))
            .with_body(params(&[("scope", "body")]));

        assert_eq!(request.param("scope"), Some("body"));
        assert_eq!(request.param("state"), Some("xyz"));
        assert_eq!(request.param("missing"), None);
    }

    #[test]
    fn test_param_empty_is_missing() {
        let request =
            Request::new(Method::GET, "/authorize").with_query(params(&[("response_type", "")]));
        assert_eq!(request.param("response_type"), None);
    }

    #[test]
    fn test_redirect() {
        let mut response = Response::new();
        response.redirect("http://example.com/cb?code=abc");
        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(
            response.header(LOCATION),
            Some("http://example.com/cb?code=abc")
        );
    }

    #[test]
    fn test_set_header_rejects_invalid_value() {
        let mut response = Response::new();
        response.set_header(LOCATION, "bad\nvalue");
        assert!(response.headers.is_empty());
    }
}

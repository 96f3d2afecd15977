use crate::errors::raised_error;
use crate::options::ServerOptions;
use crate::server::OAuth2Server;
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::Router;
use chrono::{Duration, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use oauth2_engine::{
    AuthorizationCode, Client, MockEngine, Model, OAuthError, Token, User,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Test fixture wiring an [`OAuth2Server`] backed by [`MockEngine`] into a router.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new(ServerOptions::new(), |server| {
///         Router::new()
///             .route("/secret", get(handler))
///             .route_layer(middleware::from_fn(server.authenticate()))
///     });
///
///     let response = fixture.get("/secret", Some("valid")).await;
///     response.assert_ok();
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// The adapter the router was built with
    pub server: OAuth2Server<MockEngine>,
}

impl TestFixture {
    /// Creates a fixture around a fresh [`TestModel`]
    pub fn new(
        options: ServerOptions,
        build: impl FnOnce(&OAuth2Server<MockEngine>) -> Router,
    ) -> Self {
        Self::with_model(Arc::new(TestModel::new()), options, build)
    }

    /// Creates a fixture around the given model
    pub fn with_model(
        model: Arc<dyn Model>,
        options: ServerOptions,
        build: impl FnOnce(&OAuth2Server<MockEngine>) -> Router,
    ) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let server = OAuth2Server::new(options.with_model(model))
            .expect("Failed to create OAuth2 server");
        let app = build(&server);

        Self { app, server }
    }

    /// Initializes the test logger; later calls are no-ops
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Creates a request builder, optionally carrying a bearer token
    pub fn request_builder(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        bearer: Option<&str>,
    ) -> http::request::Builder {
        let builder = Request::builder().method(method).uri(uri.as_ref());
        match bearer {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    pub async fn get(&self, uri: impl AsRef<str>, bearer: Option<&str>) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri, bearer)
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a POST request with a JSON body
    pub async fn post<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(Method::POST, uri, None)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a POST request with a form-encoded body
    pub async fn post_form(
        &self,
        uri: impl AsRef<str>,
        body: &str,
        bearer: Option<&str>,
    ) -> TestResponse {
        let request = self
            .request_builder(Method::POST, uri, bearer)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and collects the response
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let error = raised_error(&response).cloned();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        // Try to parse as JSON, defaulting to empty object if parsing fails or empty body
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        TestResponse {
            status,
            headers,
            body,
            json,
            error,
        }
    }
}

/// Response from a test request
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Bytes,
    /// Response body as JSON (if present and valid JSON)
    pub json: Value,
    /// Error raised by the adapter, if any
    pub error: Option<OAuthError>,
}

impl TestResponse {
    /// Asserts that the response has the expected status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match the expected value.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// The body as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Converts the response body to the specified type.
    ///
    /// # Panics
    ///
    /// Panics if deserialization fails.
    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }
}

/// Builds a GET request carrying a bearer token
pub fn bearer_get(uri: &str, token: &str) -> axum::extract::Request {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("Failed to build request")
}

/// Builds a form-encoded POST request, optionally carrying a bearer token
pub fn form_post(uri: &str, body: &str, bearer: Option<&str>) -> axum::extract::Request {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

/// A model that implements none of the required capabilities; only the
/// permissive `validate_scope` default remains
pub struct EmptyModel;

impl Model for EmptyModel {}

/// A model with fixed clients, one user and two known access tokens.
///
/// - client `app` / `secret`: password, authorization_code and refresh_token grants
/// - client `service` / `secret`: client_credentials only
/// - user `alice` / `wonderland`
/// - access tokens `valid` (scope `read`) and `expired`
#[derive(Default)]
pub struct TestModel {
    saved_tokens: AtomicUsize,
}

impl TestModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens saved so far
    pub fn saved_tokens(&self) -> usize {
        self.saved_tokens.load(Ordering::SeqCst)
    }

    pub fn client(id: &str) -> Option<Client> {
        let grants: &[&str] = match id {
            "app" => &["password", "authorization_code", "refresh_token"],
            "service" => &["client_credentials"],
            _ => return None,
        };
        Some(Client {
            id: id.to_string(),
            redirect_uris: vec!["http://app.test/cb".to_string()],
            grants: grants.iter().map(|grant| grant.to_string()).collect(),
            access_token_lifetime: None,
            refresh_token_lifetime: None,
        })
    }

    fn token(access_token: &str, lifetime: i64) -> Option<Token> {
        Some(Token {
            access_token: access_token.to_string(),
            access_token_expires_at: Some(Utc::now() + Duration::seconds(lifetime)),
            refresh_token: None,
            refresh_token_expires_at: None,
            scope: Some("read".to_string()),
            client: Self::client("app")?,
            user: User::new("alice"),
        })
    }
}

#[async_trait]
impl Model for TestModel {
    async fn get_access_token(&self, access_token: &str) -> Result<Option<Token>, OAuthError> {
        Ok(match access_token {
            "valid" => Self::token("valid", 3600),
            "expired" => Self::token("expired", -10),
            _ => None,
        })
    }

    async fn verify_scope(&self, token: &Token, scope: &str) -> Result<bool, OAuthError> {
        Ok(token.scope.as_deref() == Some(scope))
    }

    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Option<Client>, OAuthError> {
        if client_secret.is_some_and(|secret| secret != "secret") {
            return Ok(None);
        }
        Ok(Self::client(client_id))
    }

    async fn get_user(&self, username: &str, password: &str) -> Result<Option<User>, OAuthError> {
        Ok((username == "alice" && password == "wonderland").then(|| User::new("alice")))
    }

    async fn get_user_from_client(&self, client: &Client) -> Result<Option<User>, OAuthError> {
        Ok(Some(User::new(format!("client:{}", client.id))))
    }

    async fn save_token(&self, token: Token) -> Result<Token, OAuthError> {
        self.saved_tokens.fetch_add(1, Ordering::SeqCst);
        Ok(token)
    }

    async fn save_authorization_code(
        &self,
        code: AuthorizationCode,
    ) -> Result<AuthorizationCode, OAuthError> {
        Ok(code)
    }
}

use crate::OAuth2Engine;
use crate::error::OAuthError;
use crate::message::{Request, Response};
use crate::model::{AuthorizationCode, Client, Model, Token, User};
use crate::options::EngineOptions;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use http::header::{AUTHORIZATION, CACHE_CONTROL, PRAGMA, WWW_AUTHENTICATE};
use http::{HeaderName, Method, StatusCode};
use log::debug;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use url::Url;

const ACCEPTED_SCOPES_HEADER: HeaderName = HeaderName::from_static("x-accepted-oauth-scopes");
const AUTHORIZED_SCOPES_HEADER: HeaderName = HeaderName::from_static("x-oauth-scopes");

/// A minimal engine that drives a [`Model`] just far enough to exercise an
/// adapter end to end.
///
/// It verifies bearer tokens, issues authorization codes and issues tokens for
/// the `password` and `client_credentials` grants. It is not a compliant
/// authorization server: there is no PKCE, no code exchange and no refresh
/// grant.
#[derive(Clone)]
pub struct MockEngine {
    model: Arc<dyn Model>,
    defaults: EngineOptions,
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("defaults", &self.defaults)
            // Skip model as it doesn't implement Debug
            .finish_non_exhaustive()
    }
}

impl MockEngine {
    /// Extracts the bearer token from the header, the query string or a
    /// form body. More than one source is an error.
    fn bearer_token<'a>(
        request: &'a Request,
        options: &EngineOptions,
    ) -> Result<&'a str, OAuthError> {
        let from_header = request.header(AUTHORIZATION).map(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
                .ok_or_else(|| {
                    OAuthError::invalid_request("Invalid request: malformed authorization header")
                })
        });
        let from_query = request.query.get("access_token").map(String::as_str);
        let from_body = if request.method == Method::GET {
            None
        } else {
            request.body.get("access_token").map(String::as_str)
        };

        let sources = [from_header.is_some(), from_query.is_some(), from_body.is_some()];
        if sources.iter().filter(|present| **present).count() > 1 {
            return Err(OAuthError::invalid_request(
                "Invalid request: only one authentication method is allowed",
            ));
        }

        if let Some(token) = from_header {
            return token;
        }
        if let Some(token) = from_query {
            if !options.allow_bearer_tokens_in_query_string() {
                return Err(OAuthError::invalid_request(
                    "Invalid request: do not send bearer tokens in query URLs",
                ));
            }
            return Ok(token);
        }
        if let Some(token) = from_body {
            return Ok(token);
        }

        Err(OAuthError::unauthorized_request(
            "Unauthorized request: no authentication given",
        ))
    }

    /// Client credentials from HTTP Basic authentication or the request body.
    /// The flag reports whether Basic authentication was used.
    fn client_credentials(request: &Request) -> Result<(String, String, bool), OAuthError> {
        if let Some(encoded) = request
            .header(AUTHORIZATION)
            .and_then(|value| value.strip_prefix("Basic "))
        {
            let decoded = STANDARD
                .decode(encoded.trim())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .ok_or_else(|| {
                    OAuthError::invalid_client("Invalid client: cannot retrieve client credentials")
                })?;
            return match decoded.split_once(':') {
                Some((id, secret)) if !id.is_empty() => {
                    Ok((id.to_string(), secret.to_string(), true))
                }
                _ => Err(OAuthError::invalid_client(
                    "Invalid client: cannot retrieve client credentials",
                )),
            };
        }

        match (request.param("client_id"), request.param("client_secret")) {
            (Some(id), Some(secret)) => Ok((id.to_string(), secret.to_string(), false)),
            _ => Err(OAuthError::invalid_client(
                "Invalid client: cannot retrieve client credentials",
            )),
        }
    }

    fn random_token() -> String {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill(&mut bytes[..]);
        bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    fn expires_at(now: DateTime<Utc>, lifetime: u64) -> DateTime<Utc> {
        // Capped at roughly a century to stay inside chrono's range
        let seconds = i64::try_from(lifetime).unwrap_or(i64::MAX).min(3_153_600_000);
        now + Duration::seconds(seconds)
    }

    async fn resolve_scope(
        &self,
        request: &Request,
        user: &User,
        client: &Client,
    ) -> Result<Option<String>, OAuthError> {
        let requested = request.param("scope");
        let scope = self.model.validate_scope(user, client, requested).await?;
        if requested.is_some() && scope.is_none() {
            return Err(OAuthError::invalid_scope(
                "Invalid scope: Requested scope is invalid",
            ));
        }
        Ok(scope)
    }

    async fn grant_user(&self, request: &Request, client: &Client) -> Result<User, OAuthError> {
        let grant_type = request.param("grant_type").unwrap_or_default();
        match grant_type {
            "password" => {
                let username = request
                    .param("username")
                    .ok_or_else(|| OAuthError::missing_parameter("username"))?;
                let password = request
                    .param("password")
                    .ok_or_else(|| OAuthError::missing_parameter("password"))?;
                self.model
                    .get_user(username, password)
                    .await?
                    .ok_or_else(|| {
                        OAuthError::invalid_grant("Invalid grant: user credentials are invalid")
                    })
            }
            "client_credentials" => self
                .model
                .get_user_from_client(client)
                .await?
                .ok_or_else(|| {
                    OAuthError::invalid_grant("Invalid grant: user credentials are invalid")
                }),
            _ => Err(OAuthError::unsupported_grant_type(
                "Unsupported grant type: `grant_type` is invalid",
            )),
        }
    }

    fn bearer_body(token: &Token, now: DateTime<Utc>) -> serde_json::Value {
        let mut body = json!({
            "access_token": token.access_token,
            "token_type": "Bearer",
        });
        if let Some(expires_at) = token.access_token_expires_at {
            body["expires_in"] = json!((expires_at - now).num_seconds().max(0));
        }
        if let Some(refresh_token) = &token.refresh_token {
            body["refresh_token"] = json!(refresh_token);
        }
        if let Some(scope) = &token.scope {
            body["scope"] = json!(scope);
        }
        body
    }
}

#[async_trait]
impl OAuth2Engine for MockEngine {
    fn new(model: Arc<dyn Model>, options: &EngineOptions) -> Self {
        Self {
            model,
            defaults: options.clone(),
        }
    }

    async fn authenticate(
        &self,
        request: &Request,
        response: &mut Response,
        options: &EngineOptions,
    ) -> Result<Token, OAuthError> {
        let options = self.defaults.merged_with(options);

        let access_token = match Self::bearer_token(request, &options) {
            Ok(token) => token,
            Err(e) => {
                response.set_header(WWW_AUTHENTICATE, "Bearer realm=\"Service\"");
                return Err(e);
            }
        };

        let token = self
            .model
            .get_access_token(access_token)
            .await?
            .ok_or_else(|| OAuthError::invalid_token("Invalid token: access token is invalid"))?;

        if token.is_expired(Utc::now()) {
            return Err(OAuthError::invalid_token(
                "Invalid token: access token has expired",
            ));
        }

        if let Some(scope) = &options.scope {
            if !self.model.verify_scope(&token, scope).await? {
                return Err(OAuthError::insufficient_scope(
                    "Insufficient scope: authorized scope is insufficient",
                ));
            }
            if options.add_accepted_scopes_header() {
                response.set_header(ACCEPTED_SCOPES_HEADER, scope);
            }
            if options.add_authorized_scopes_header() {
                response.set_header(
                    AUTHORIZED_SCOPES_HEADER,
                    token.scope.as_deref().unwrap_or_default(),
                );
            }
        }

        debug!("Verified access token for user '{}'", token.user.id);
        Ok(token)
    }

    async fn authorize(
        &self,
        request: &Request,
        response: &mut Response,
        options: &EngineOptions,
    ) -> Result<AuthorizationCode, OAuthError> {
        let options = self.defaults.merged_with(options);

        let response_type = request
            .param("response_type")
            .ok_or_else(|| OAuthError::missing_parameter("response_type"))?;
        if response_type != "code" {
            return Err(OAuthError::unsupported_response_type(
                "Unsupported response type: `response_type` is not supported",
            ));
        }

        let client_id = request
            .param("client_id")
            .ok_or_else(|| OAuthError::missing_parameter("client_id"))?;
        let client = self
            .model
            .get_client(client_id, None)
            .await?
            .ok_or_else(|| OAuthError::invalid_client("Invalid client: client credentials are invalid"))?;

        if !client.supports_grant("authorization_code") {
            return Err(OAuthError::unauthorized_client(
                "Unauthorized client: `grant_type` is invalid",
            ));
        }

        let redirect_uri = match request.param("redirect_uri") {
            Some(uri) if client.redirect_uris.iter().any(|known| known == uri) => uri.to_string(),
            Some(_) => {
                return Err(OAuthError::invalid_client(
                    "Invalid client: `redirect_uri` does not match client value",
                ));
            }
            None => client.redirect_uris.first().cloned().ok_or_else(|| {
                OAuthError::invalid_client("Invalid client: missing client `redirect_uri`")
            })?,
        };

        let state = request.param("state");
        if state.is_none() && !options.allow_empty_state() {
            return Err(OAuthError::missing_parameter("state"));
        }

        // The resource owner is whoever holds the bearer token on this request
        let user = self.authenticate(request, response, &options).await?.user;
        let scope = self.resolve_scope(request, &user, &client).await?;

        let mut location = Url::parse(&redirect_uri).map_err(|_| {
            OAuthError::invalid_request("Invalid request: `redirect_uri` is not a valid URI")
        })?;

        let code = AuthorizationCode {
            authorization_code: Self::random_token(),
            expires_at: Self::expires_at(Utc::now(), options.authorization_code_lifetime()),
            redirect_uri,
            scope,
            client,
            user,
        };
        let code = self.model.save_authorization_code(code).await?;

        location
            .query_pairs_mut()
            .append_pair("code", &code.authorization_code);
        if let Some(state) = state {
            location.query_pairs_mut().append_pair("state", state);
        }
        response.redirect(location.as_str());

        debug!(
            "Issued authorization code for user '{}' via client '{}'",
            code.user.id, code.client.id
        );
        Ok(code)
    }

    async fn token(
        &self,
        request: &Request,
        response: &mut Response,
        options: &EngineOptions,
    ) -> Result<Token, OAuthError> {
        let options = self.defaults.merged_with(options);

        if request.method != Method::POST {
            return Err(OAuthError::invalid_request(
                "Invalid request: method must be POST",
            ));
        }

        let (client_id, client_secret, basic_auth) = Self::client_credentials(request)?;
        let grant_type = request
            .param("grant_type")
            .ok_or_else(|| OAuthError::missing_parameter("grant_type"))?;

        let client = match self
            .model
            .get_client(&client_id, Some(&client_secret))
            .await?
        {
            Some(client) => client,
            None => {
                let error = OAuthError::invalid_client("Invalid client: client is invalid");
                if basic_auth {
                    response.set_header(WWW_AUTHENTICATE, "Basic realm=\"Service\"");
                    return Err(error.with_status(StatusCode::UNAUTHORIZED));
                }
                return Err(error);
            }
        };

        if !client.supports_grant(grant_type) {
            return Err(OAuthError::unauthorized_client(
                "Unauthorized client: `grant_type` is invalid",
            ));
        }

        let user = self.grant_user(request, &client).await?;
        let scope = self.resolve_scope(request, &user, &client).await?;

        let now = Utc::now();
        let access_lifetime = client
            .access_token_lifetime
            .unwrap_or_else(|| options.access_token_lifetime());
        let refresh_lifetime = client
            .refresh_token_lifetime
            .unwrap_or_else(|| options.refresh_token_lifetime());
        let issue_refresh = grant_type != "client_credentials" && client.supports_grant("refresh_token");

        let token = Token {
            access_token: Self::random_token(),
            access_token_expires_at: Some(Self::expires_at(now, access_lifetime)),
            refresh_token: issue_refresh.then(Self::random_token),
            refresh_token_expires_at: issue_refresh.then(|| Self::expires_at(now, refresh_lifetime)),
            scope,
            client,
            user,
        };
        let token = self.model.save_token(token).await?;

        response.status = StatusCode::OK;
        response.set_header(CACHE_CONTROL, "no-store");
        response.set_header(PRAGMA, "no-cache");
        response.body = Some(Self::bearer_body(&token, now));

        debug!(
            "Issued {} token for user '{}' via client '{}'",
            grant_type, token.user.id, token.client.id
        );
        Ok(token)
    }
}

//! The model capability object and the records it exchanges with an engine.
//!
//! A [`Model`] is written by the integrator. Engines call it to look up
//! clients, users and tokens and to persist what they issue; adapters only
//! hand it to the engine at construction time.

use crate::error::OAuthError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered OAuth client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Grant types the client may use, e.g. `password` or `authorization_code`
    #[serde(default)]
    pub grants: Vec<String>,
    /// Per-client override of the access token lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<u64>,
    /// Per-client override of the refresh token lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<u64>,
}

impl Client {
    pub fn supports_grant(&self, grant_type: &str) -> bool {
        self.grants.iter().any(|grant| grant == grant_type)
    }
}

/// The resource owner a token or code was issued for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// An issued access token with its optional refresh token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub client: Client,
    pub user: User,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_token_expires_at
            .map(|expires_at| expires_at <= now)
            .unwrap_or(false)
    }
}

/// An issued authorization code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub authorization_code: String,
    pub expires_at: DateTime<Utc>,
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub client: Client,
    pub user: User,
}

/// Persistence and lookup capabilities an engine relies on.
///
/// Every method has a default body. Required capabilities fail with an
/// `invalid_argument` error naming the method, so an engine reports exactly
/// which capability the integrator forgot. Optional capabilities default to
/// permissive behaviour.
#[async_trait]
pub trait Model: Send + Sync {
    /// Looks up an access token
    async fn get_access_token(&self, _access_token: &str) -> Result<Option<Token>, OAuthError> {
        Err(OAuthError::not_implemented("get_access_token"))
    }

    /// Checks that `token` grants `scope`
    async fn verify_scope(&self, _token: &Token, _scope: &str) -> Result<bool, OAuthError> {
        Err(OAuthError::not_implemented("verify_scope"))
    }

    /// Looks up a client. `client_secret` is `None` when the caller only
    /// identifies the client, as in an authorization request.
    async fn get_client(
        &self,
        _client_id: &str,
        _client_secret: Option<&str>,
    ) -> Result<Option<Client>, OAuthError> {
        Err(OAuthError::not_implemented("get_client"))
    }

    /// Looks up a user by credentials (password grant)
    async fn get_user(&self, _username: &str, _password: &str) -> Result<Option<User>, OAuthError> {
        Err(OAuthError::not_implemented("get_user"))
    }

    /// Resolves the user a client acts as (client credentials grant)
    async fn get_user_from_client(&self, _client: &Client) -> Result<Option<User>, OAuthError> {
        Err(OAuthError::not_implemented("get_user_from_client"))
    }

    /// Persists an issued token and returns the stored form
    async fn save_token(&self, _token: Token) -> Result<Token, OAuthError> {
        Err(OAuthError::not_implemented("save_token"))
    }

    /// Persists an issued authorization code and returns the stored form
    async fn save_authorization_code(
        &self,
        _code: AuthorizationCode,
    ) -> Result<AuthorizationCode, OAuthError> {
        Err(OAuthError::not_implemented("save_authorization_code"))
    }

    /// Narrows or rejects a requested scope. `Ok(None)` rejects it.
    async fn validate_scope(
        &self,
        _user: &User,
        _client: &Client,
        scope: Option<&str>,
    ) -> Result<Option<String>, OAuthError> {
        Ok(scope.map(str::to_string))
    }
}

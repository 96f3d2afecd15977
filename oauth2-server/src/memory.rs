use async_trait::async_trait;
use log::debug;
use moka::future::Cache as MokaCache;
use oauth2_engine::{AuthorizationCode, Client, Model, OAuthError, Token, User};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// An in-memory [`Model`] for demos and tests.
///
/// Clients, users and scopes are fixed at construction. Issued tokens and
/// authorization codes live in moka caches and are evicted after `ttl_secs`
/// or when the cache is full.
#[derive(Clone)]
pub struct MemoryModel {
    clients: HashMap<String, (Client, String)>,
    users: HashMap<String, (User, String)>,
    scopes: HashSet<String>,
    tokens: MokaCache<String, Token>,
    codes: MokaCache<String, AuthorizationCode>,
}

impl MemoryModel {
    /// Initialize an empty model whose stores keep entries for `ttl_secs` and
    /// hold at most `capacity` entries each
    pub fn new(ttl_secs: u64, capacity: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        Self {
            clients: HashMap::new(),
            users: HashMap::new(),
            scopes: HashSet::new(),
            tokens: MokaCache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity)
                .build(),
            codes: MokaCache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity)
                .build(),
        }
    }

    pub fn with_client(mut self, client: Client, secret: impl Into<String>) -> Self {
        self.clients
            .insert(client.id.clone(), (client, secret.into()));
        self
    }

    pub fn with_user(mut self, user: User, password: impl Into<String>) -> Self {
        self.users.insert(user.id.clone(), (user, password.into()));
        self
    }

    /// Scopes clients may request. With none configured every request for a
    /// scope is rejected.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    /// Looks up an issued authorization code
    pub async fn authorization_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.get(code).await
    }
}

#[async_trait]
impl Model for MemoryModel {
    async fn get_access_token(&self, access_token: &str) -> Result<Option<Token>, OAuthError> {
        Ok(self.tokens.get(access_token).await)
    }

    async fn verify_scope(&self, token: &Token, scope: &str) -> Result<bool, OAuthError> {
        let granted: HashSet<&str> = token
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .collect();
        Ok(scope.split_whitespace().all(|s| granted.contains(s)))
    }

    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Option<Client>, OAuthError> {
        Ok(self
            .clients
            .get(client_id)
            .filter(|(_, secret)| client_secret.map_or(true, |given| secret.as_str() == given))
            .map(|(client, _)| client.clone()))
    }

    async fn get_user(&self, username: &str, password: &str) -> Result<Option<User>, OAuthError> {
        Ok(self
            .users
            .get(username)
            .filter(|(_, expected)| expected.as_str() == password)
            .map(|(user, _)| user.clone()))
    }

    async fn get_user_from_client(&self, client: &Client) -> Result<Option<User>, OAuthError> {
        Ok(Some(User::new(client.id.clone())))
    }

    async fn save_token(&self, token: Token) -> Result<Token, OAuthError> {
        debug!("Storing access token for user '{}'", token.user.id);
        self.tokens
            .insert(token.access_token.clone(), token.clone())
            .await;
        Ok(token)
    }

    async fn save_authorization_code(
        &self,
        code: AuthorizationCode,
    ) -> Result<AuthorizationCode, OAuthError> {
        debug!("Storing authorization code for user '{}'", code.user.id);
        self.codes
            .insert(code.authorization_code.clone(), code.clone())
            .await;
        Ok(code)
    }

    async fn validate_scope(
        &self,
        _user: &User,
        _client: &Client,
        scope: Option<&str>,
    ) -> Result<Option<String>, OAuthError> {
        Ok(scope.filter(|requested| {
            requested
                .split_whitespace()
                .all(|s| self.scopes.contains(s))
        })
        .map(str::to_string))
    }
}

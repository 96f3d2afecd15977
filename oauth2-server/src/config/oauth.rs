//! OAuth 2.0 adapter configuration

use confique::Config;
use oauth2_engine::EngineOptions;

/// Adapter behaviour and the engine options forwarded at construction
#[derive(Debug, Config, Clone)]
pub struct OAuthConfig {
    /// Raise errors to an outer error handler instead of rendering them
    /// (default: false)
    #[config(env = "OAUTH2_USE_ERROR_HANDLER", default = false)]
    pub use_error_handler: bool,

    /// Run the next handler after a successful authorize/token call
    /// (default: false)
    #[config(env = "OAUTH2_CONTINUE_MIDDLEWARE", default = false)]
    pub continue_middleware: bool,

    /// Maximum request body size read by the adapter in bytes (default: 1 MiB)
    #[config(env = "OAUTH2_BODY_LIMIT", default = 1048576)]
    pub body_limit: usize,

    /// Access token lifetime in seconds
    #[config(env = "OAUTH2_ACCESS_TOKEN_LIFETIME")]
    pub access_token_lifetime: Option<u64>,

    /// Refresh token lifetime in seconds
    #[config(env = "OAUTH2_REFRESH_TOKEN_LIFETIME")]
    pub refresh_token_lifetime: Option<u64>,

    /// Authorization code lifetime in seconds
    #[config(env = "OAUTH2_AUTHORIZATION_CODE_LIFETIME")]
    pub authorization_code_lifetime: Option<u64>,

    /// Accept bearer tokens in the query string
    #[config(env = "OAUTH2_ALLOW_BEARER_TOKENS_IN_QUERY_STRING")]
    pub allow_bearer_tokens_in_query_string: Option<bool>,

    /// Accept authorization requests without `state`
    #[config(env = "OAUTH2_ALLOW_EMPTY_STATE")]
    pub allow_empty_state: Option<bool>,
}

impl OAuthConfig {
    /// Engine options carried by this configuration
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            access_token_lifetime: self.access_token_lifetime,
            refresh_token_lifetime: self.refresh_token_lifetime,
            authorization_code_lifetime: self.authorization_code_lifetime,
            allow_bearer_tokens_in_query_string: self.allow_bearer_tokens_in_query_string,
            allow_empty_state: self.allow_empty_state,
            ..Default::default()
        }
    }
}

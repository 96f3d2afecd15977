use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_ACCESS_TOKEN_LIFETIME: u64 = 3600;
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: u64 = 1_209_600;
pub const DEFAULT_AUTHORIZATION_CODE_LIFETIME: u64 = 300;

/// Options forwarded untouched from the adapter to the engine.
///
/// Every field is optional so that per-call options can be layered over the
/// ones given at construction with [`EngineOptions::merged_with`]. Accessors
/// resolve unset fields to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Access token lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<u64>,

    /// Refresh token lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<u64>,

    /// Authorization code lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code_lifetime: Option<u64>,

    /// Accept `access_token` as a query parameter when authenticating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_bearer_tokens_in_query_string: Option<bool>,

    /// Allow authorization requests without a `state` parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_empty_state: Option<bool>,

    /// Scope an access token must carry to pass authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Send `X-Accepted-OAuth-Scopes` on authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_accepted_scopes_header: Option<bool>,

    /// Send `X-OAuth-Scopes` on authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_authorized_scopes_header: Option<bool>,

    /// Engine-specific options the adapter knows nothing about
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl EngineOptions {
    /// Returns a copy of `self` where every option set in `overrides` wins.
    pub fn merged_with(&self, overrides: &EngineOptions) -> EngineOptions {
        let mut extra = self.extra.clone();
        extra.extend(
            overrides
                .extra
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        EngineOptions {
            access_token_lifetime: overrides
                .access_token_lifetime
                .or(self.access_token_lifetime),
            refresh_token_lifetime: overrides
                .refresh_token_lifetime
                .or(self.refresh_token_lifetime),
            authorization_code_lifetime: overrides
                .authorization_code_lifetime
                .or(self.authorization_code_lifetime),
            allow_bearer_tokens_in_query_string: overrides
                .allow_bearer_tokens_in_query_string
                .or(self.allow_bearer_tokens_in_query_string),
            allow_empty_state: overrides.allow_empty_state.or(self.allow_empty_state),
            scope: overrides.scope.clone().or_else(|| self.scope.clone()),
            add_accepted_scopes_header: overrides
                .add_accepted_scopes_header
                .or(self.add_accepted_scopes_header),
            add_authorized_scopes_header: overrides
                .add_authorized_scopes_header
                .or(self.add_authorized_scopes_header),
            extra,
        }
    }

    pub fn access_token_lifetime(&self) -> u64 {
        self.access_token_lifetime
            .unwrap_or(DEFAULT_ACCESS_TOKEN_LIFETIME)
    }

    pub fn refresh_token_lifetime(&self) -> u64 {
        self.refresh_token_lifetime
            .unwrap_or(DEFAULT_REFRESH_TOKEN_LIFETIME)
    }

    pub fn authorization_code_lifetime(&self) -> u64 {
        self.authorization_code_lifetime
            .unwrap_or(DEFAULT_AUTHORIZATION_CODE_LIFETIME)
    }

    pub fn allow_bearer_tokens_in_query_string(&self) -> bool {
        self.allow_bearer_tokens_in_query_string.unwrap_or(false)
    }

    pub fn allow_empty_state(&self) -> bool {
        self.allow_empty_state.unwrap_or(false)
    }

    pub fn add_accepted_scopes_header(&self) -> bool {
        self.add_accepted_scopes_header.unwrap_or(true)
    }

    pub fn add_authorized_scopes_header(&self) -> bool {
        self.add_authorized_scopes_header.unwrap_or(true)
    }
}

//! # oauth2-engine
//!
//! The contract between a web-framework adapter and an OAuth 2.0 protocol
//! engine.
//!
//! ## Components
//!
//! - **Engine:** [`OAuth2Engine`], the three protocol operations an adapter calls.
//! - **Model:** [`Model`], the integrator-owned capability object an engine is built with.
//! - **Messages:** [`Request`] and [`Response`], framework-independent value objects.
//! - **Mock:** [`MockEngine`], a small model-driven engine for tests and demos.

pub mod error;
pub mod message;
pub mod mock_engine;
pub mod model;
pub mod options;

pub use crate::error::{ErrorKind, OAuthError};
pub use crate::message::{Request, Response};
pub use crate::mock_engine::MockEngine;
pub use crate::model::{AuthorizationCode, Client, Model, Token, User};
pub use crate::options::EngineOptions;

use async_trait::async_trait;
use std::sync::Arc;

/// Trait defining the operations an adapter invokes on an OAuth 2.0 engine.
///
/// One engine instance serves every request, so implementations must be safe
/// to call concurrently. Each operation may write status, headers and body to
/// `response` on success and on failure; the adapter copies whatever is there.
#[async_trait]
pub trait OAuth2Engine: Send + Sync + 'static {
    /// Builds the engine around the integrator's model
    fn new(model: Arc<dyn Model>, options: &EngineOptions) -> Self
    where
        Self: Sized;

    /// Verifies the access token presented with the request
    async fn authenticate(
        &self,
        request: &Request,
        response: &mut Response,
        options: &EngineOptions,
    ) -> Result<Token, OAuthError>;

    /// Issues an authorization code and prepares the redirect back to the client
    async fn authorize(
        &self,
        request: &Request,
        response: &mut Response,
        options: &EngineOptions,
    ) -> Result<AuthorizationCode, OAuthError>;

    /// Issues an access token for the requested grant
    async fn token(
        &self,
        request: &Request,
        response: &mut Response,
        options: &EngineOptions,
    ) -> Result<Token, OAuthError>;
}

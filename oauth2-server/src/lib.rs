//! # oauth2-server
//!
//! Connects an OAuth 2.0 engine ([`oauth2_engine::OAuth2Engine`]) to axum.
//!
//! [`OAuth2Server`] builds one engine from the integrator's model and exposes
//! `authenticate`, `authorize` and `token` as middleware. Results are stored in
//! the request extensions as [`OAuthState`]; errors are either rendered as
//! JSON or raised to an outer layer, see [`ServerOptions`].

pub mod config;
pub mod context;
pub mod errors;
pub mod memory;
pub mod middleware;
pub mod options;
pub mod server;
#[cfg(test)]
mod test_utils;

pub use crate::context::{OAuthState, ParsedBody};
pub use crate::errors::{raised_error, ErrorBody, StartupError};
pub use crate::memory::MemoryModel;
pub use crate::options::ServerOptions;
pub use crate::server::{OAuth2Server, Outcome};
pub use oauth2_engine::{EngineOptions, ErrorKind, OAuth2Engine, OAuthError};

//! axum middleware built from an [`OAuth2Server`].
//!
//! Each method returns a function for [`axum::middleware::from_fn`]:
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/secret", get(secret))
//!     .route_layer(middleware::from_fn(server.authenticate()));
//! ```

use crate::context::apply_headers;
use crate::errors::raise_error;
use crate::server::{OAuth2Server, Outcome};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use oauth2_engine::{EngineOptions, OAuth2Engine};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

impl<E: OAuth2Engine> OAuth2Server<E> {
    /// Middleware that lets only requests with a valid access token through
    pub fn authenticate(
        &self,
    ) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        let server = self.clone();
        move |request: Request, next: Next| -> MiddlewareFuture {
            let server = server.clone();
            Box::pin(async move { run(server.handle_authenticate(request).await, next).await })
        }
    }

    /// Middleware for the authorization endpoint
    pub fn authorize(
        &self,
        options: Option<EngineOptions>,
    ) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        let server = self.clone();
        let options = options.map(Arc::new);
        move |request: Request, next: Next| -> MiddlewareFuture {
            let server = server.clone();
            let options = options.clone();
            Box::pin(async move {
                let outcome = server.handle_authorize(request, options.as_deref()).await;
                run(outcome, next).await
            })
        }
    }

    /// Middleware for the token endpoint
    pub fn token(
        &self,
        options: Option<EngineOptions>,
    ) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        let server = self.clone();
        let options = options.map(Arc::new);
        move |request: Request, next: Next| -> MiddlewareFuture {
            let server = server.clone();
            let options = options.clone();
            Box::pin(async move {
                let outcome = server.handle_token(request, options.as_deref()).await;
                run(outcome, next).await
            })
        }
    }
}

/// Carries an [`Outcome`] out into the middleware chain
pub async fn run(outcome: Outcome, next: Next) -> Response {
    match outcome {
        Outcome::Next { request, response } => {
            let mut downstream = next.run(request).await;
            apply_headers(&response.headers, &mut downstream);
            downstream
        }
        Outcome::Respond(response) => response,
        Outcome::Raise { error, response } => raise_error(error, response.headers),
    }
}

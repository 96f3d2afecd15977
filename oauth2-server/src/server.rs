use crate::context::{engine_request, into_http_response, BodyPolicy, OAuthState};
use crate::errors::render_error;
use crate::options::ServerOptions;
use axum::extract::Request;
use axum::response::Response;
use log::{debug, info, warn};
use oauth2_engine::{
    EngineOptions, OAuth2Engine, OAuthError, Request as EngineRequest, Response as EngineResponse,
};
use std::borrow::Cow;
use std::sync::Arc;

/// How a request leaves one of the adapter's operations
#[derive(Debug)]
pub enum Outcome {
    /// Hand the request on to the next handler. The engine response still
    /// holds headers to merge into whatever that handler returns.
    Next {
        request: Request,
        response: EngineResponse,
    },
    /// The adapter produced the final response
    Respond(Response),
    /// Pass the error to the error handling layer wrapping the route
    Raise {
        error: OAuthError,
        response: EngineResponse,
    },
}

/// Which engine operation a request is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Authenticate,
    Authorize,
    Token,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Operation::Authenticate => "authenticate",
            Operation::Authorize => "authorize",
            Operation::Token => "token",
        }
    }
}

/// Connects an OAuth 2.0 engine to axum.
///
/// The adapter owns one engine built from the configured model and exposes
/// its three operations as request-processing steps. Cloning is cheap and
/// every clone shares the same engine.
pub struct OAuth2Server<E: OAuth2Engine> {
    engine: Arc<E>,
    options: Arc<ServerOptions>,
}

impl<E: OAuth2Engine> Clone for OAuth2Server<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            options: self.options.clone(),
        }
    }
}

impl<E: OAuth2Engine> std::fmt::Debug for OAuth2Server<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Server")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: OAuth2Engine> OAuth2Server<E> {
    /// Builds the adapter and its engine.
    ///
    /// Fails with `invalid_argument` when no model is given.
    pub fn new(options: ServerOptions) -> Result<Self, OAuthError> {
        let model = options
            .model
            .clone()
            .ok_or_else(|| OAuthError::invalid_argument("Missing parameter: `model`"))?;

        let engine = E::new(model, &options.engine);
        info!(
            "OAuth2 server ready (use_error_handler={}, continue_middleware={})",
            options.use_error_handler, options.continue_middleware
        );

        Ok(Self {
            engine: Arc::new(engine),
            options: Arc::new(options),
        })
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Verifies the access token on the request.
    ///
    /// On success the token is stored in [`OAuthState`] and the request always
    /// continues. Failures are always raised. Only a form body is inspected
    /// for a token; other bodies pass through unread.
    pub async fn handle_authenticate(&self, request: Request) -> Outcome {
        let (mut request, engine_request) =
            match self.translate(request, BodyPolicy::FormOnly).await {
                Ok(translated) => translated,
                Err(error) => {
                    return Self::raise(Operation::Authenticate, error, EngineResponse::new())
                }
            };

        let mut response = EngineResponse::new();
        match self
            .engine
            .authenticate(&engine_request, &mut response, &self.options.engine)
            .await
        {
            Ok(token) => {
                debug!("Authenticated request for user '{}'", token.user.id);
                Self::update_state(&mut request, |state| state.token = Some(token));
                // The downstream response is left as the handler builds it
                Outcome::Next {
                    request,
                    response: EngineResponse::new(),
                }
            }
            Err(error) => Self::raise(Operation::Authenticate, error, response),
        }
    }

    /// Issues an authorization code; the default response is the engine's
    /// redirect back to the client
    pub async fn handle_authorize(
        &self,
        request: Request,
        options: Option<&EngineOptions>,
    ) -> Outcome {
        let (mut request, engine_request) = match self.translate(request, BodyPolicy::Strict).await {
            Ok(translated) => translated,
            Err(error) => return self.fail(Operation::Authorize, error, EngineResponse::new()),
        };

        let options = self.call_options(options);
        let mut response = EngineResponse::new();
        match self
            .engine
            .authorize(&engine_request, &mut response, &options)
            .await
        {
            Ok(code) => {
                info!(
                    "Issued authorization code for client '{}'",
                    code.client.id
                );
                Self::update_state(&mut request, |state| state.code = Some(code));
                self.succeed(request, response)
            }
            Err(error) => self.fail(Operation::Authorize, error, response),
        }
    }

    /// Issues an access token; the default response is the engine's JSON
    /// token response
    pub async fn handle_token(&self, request: Request, options: Option<&EngineOptions>) -> Outcome {
        let (mut request, engine_request) = match self.translate(request, BodyPolicy::Strict).await {
            Ok(translated) => translated,
            Err(error) => return self.fail(Operation::Token, error, EngineResponse::new()),
        };

        let options = self.call_options(options);
        let mut response = EngineResponse::new();
        match self
            .engine
            .token(&engine_request, &mut response, &options)
            .await
        {
            Ok(token) => {
                info!(
                    "Issued access token for user '{}' via client '{}'",
                    token.user.id, token.client.id
                );
                Self::update_state(&mut request, |state| state.token = Some(token));
                self.succeed(request, response)
            }
            Err(error) => self.fail(Operation::Token, error, response),
        }
    }

    async fn translate(
        &self,
        request: Request,
        policy: BodyPolicy,
    ) -> Result<(Request, EngineRequest), OAuthError> {
        engine_request(request, self.options.body_limit, policy).await
    }

    /// Per-call options layered over the ones given at construction
    fn call_options<'a>(&'a self, options: Option<&EngineOptions>) -> Cow<'a, EngineOptions> {
        match options {
            Some(overrides) => Cow::Owned(self.options.engine.merged_with(overrides)),
            None => Cow::Borrowed(&self.options.engine),
        }
    }

    fn update_state(request: &mut Request, update: impl FnOnce(&mut OAuthState)) {
        let mut state = request
            .extensions()
            .get::<OAuthState>()
            .cloned()
            .unwrap_or_default();
        update(&mut state);
        request.extensions_mut().insert(state);
    }

    fn succeed(&self, request: Request, response: EngineResponse) -> Outcome {
        if self.options.continue_middleware {
            Outcome::Next { request, response }
        } else {
            Outcome::Respond(into_http_response(response))
        }
    }

    /// Errors never continue the chain; they are raised or rendered
    fn fail(&self, operation: Operation, error: OAuthError, response: EngineResponse) -> Outcome {
        if self.options.use_error_handler {
            return Self::raise(operation, error, response);
        }
        warn!(
            "OAuth {} failed: {} ({})",
            operation.as_str(),
            error.name(),
            error.message
        );
        Outcome::Respond(render_error(&error, response))
    }

    fn raise(operation: Operation, error: OAuthError, response: EngineResponse) -> Outcome {
        warn!(
            "Raising {} error from OAuth {}",
            error.name(),
            operation.as_str()
        );
        Outcome::Raise { error, response }
    }
}

use crate::config::OAuthConfig;
use oauth2_engine::{EngineOptions, Model};
use std::fmt;
use std::sync::Arc;

/// Default limit on request bodies read by the adapter (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Options accepted by [`crate::OAuth2Server::new`]
#[derive(Clone)]
pub struct ServerOptions {
    /// The integrator's model, handed to the engine untouched. Required.
    pub model: Option<Arc<dyn Model>>,

    /// Raise errors to an outer error handler instead of rendering them
    pub use_error_handler: bool,

    /// Run the next handler after a successful `authorize` or `token`
    pub continue_middleware: bool,

    /// Maximum request body size read when no upstream layer parsed it
    pub body_limit: usize,

    /// Options forwarded to the engine
    pub engine: EngineOptions,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            model: None,
            use_error_handler: false,
            continue_middleware: false,
            body_limit: DEFAULT_BODY_LIMIT,
            engine: EngineOptions::default(),
        }
    }
}

impl fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerOptions")
            .field("model", &self.model.as_ref().map(|_| "<model>"))
            .field("use_error_handler", &self.use_error_handler)
            .field("continue_middleware", &self.continue_middleware)
            .field("body_limit", &self.body_limit)
            .field("engine", &self.engine)
            .finish()
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options described by a loaded configuration; the model still has to be set
    pub fn from_config(config: &OAuthConfig) -> Self {
        Self {
            model: None,
            use_error_handler: config.use_error_handler,
            continue_middleware: config.continue_middleware,
            body_limit: config.body_limit,
            engine: config.engine_options(),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_error_handler(mut self, use_error_handler: bool) -> Self {
        self.use_error_handler = use_error_handler;
        self
    }

    pub fn with_continue_middleware(mut self, continue_middleware: bool) -> Self {
        self.continue_middleware = continue_middleware;
        self
    }

    pub fn with_engine_options(mut self, engine: EngineOptions) -> Self {
        self.engine = engine;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confique::Config;

    #[test]
    fn test_defaults() {
        let options = ServerOptions::new();
        assert!(options.model.is_none());
        assert!(!options.use_error_handler);
        assert!(!options.continue_middleware);
        assert_eq!(options.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn test_from_config() {
        let config = OAuthConfig {
            use_error_handler: true,
            body_limit: 512,
            authorization_code_lifetime: Some(30),
            ..OAuthConfig::builder().load().unwrap()
        };
        let options = ServerOptions::from_config(&config);
        assert!(options.use_error_handler);
        assert!(!options.continue_middleware);
        assert_eq!(options.body_limit, 512);
        assert_eq!(options.engine.authorization_code_lifetime(), 30);
    }

    #[test]
    fn test_debug_hides_model() {
        struct Empty;
        impl Model for Empty {}

        let options = ServerOptions::new().with_model(Arc::new(Empty));
        let debug = format!("{:?}", options);
        assert!(debug.contains("<model>"));
    }
}

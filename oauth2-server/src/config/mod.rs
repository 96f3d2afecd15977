pub use crate::config::oauth::OAuthConfig;
use confique::Config;

pub mod oauth;

/// Default location of the optional TOML configuration file
pub const CONFIG_FILE: &str = "oauth2-server.toml";

/// Main configuration structure for the demo server
#[derive(Debug, Config, Clone)]
pub struct Settings {
    /// The port the server will listen to (default: 7766)
    #[config(env = "OAUTH2_PORT", default = 7766)]
    pub port: u16,

    /// Adapter configuration
    #[config(nested)]
    pub oauth: OAuthConfig,
}

impl Settings {
    /// Loads settings from environment variables, then the optional config
    /// file, then the built-in defaults
    pub fn new() -> Result<Self, confique::Error> {
        Settings::builder().env().file(CONFIG_FILE).load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::builder().load().unwrap();
        assert_eq!(settings.port, 7766);
        assert!(!settings.oauth.use_error_handler);
        assert!(!settings.oauth.continue_middleware);
    }

    #[test]
    fn test_port_from_env() {
        std::env::set_var("OAUTH2_PORT", "8080");

        let settings = Settings::builder().env().load().unwrap();
        assert_eq!(settings.port, 8080);

        std::env::remove_var("OAUTH2_PORT");
    }
}

use crate::config::auth::AuthSettings;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

pub mod auth;

/// Main configuration structure for the resource server
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// The port the server will listen to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Token validation and authorization policy configuration
    #[serde(default)]
    pub auth: AuthSettings,
}

fn default_port() -> u16 {
    8080
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: default_port(),
            auth: AuthSettings::default(),
        }
    }
}

impl Settings {
    /// Creates a new Settings instance from environment variables.
    ///
    /// Nesting uses a double underscore, e.g. `AUTHZ_AUTH__ISSUER_URI` sets
    /// `auth.issuer_uri` and `AUTHZ_PORT` sets `port`.
    pub fn new() -> Result<Self, String> {
        Config::builder()
            .add_source(
                Environment::with_prefix("AUTHZ")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e| e.to_string())
    }

    #[cfg(test)]
    pub fn for_test_with_mocks(jwks_mock: &wiremock::MockServer) -> Self {
        use std::collections::HashMap;

        Self {
            port: 0, // Let the OS choose a port
            auth: AuthSettings {
                issuer_uri: "https://issuer.test".to_string(),
                audience: "customer-profiles-api".to_string(),
                // Use the mock server address for testing
                jwks_uri: Some(format!("{}/jwks.json", jwks_mock.uri())),
                clock_skew_secs: 60,
                keys_ttl_secs: 300,
                keys_cooldown_secs: 30,
                fetch_timeout_secs: 5,
                scope_implications: HashMap::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_listen_on_8080() {
        let settings = Settings::default();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.auth.issuer_uri, "");
    }
}

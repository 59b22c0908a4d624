use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Configuration for token validation and the authorization policy
#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    /// Issuer URI of the trusted authorization server; tokens must carry it
    /// verbatim in their `iss` claim
    #[serde(default)]
    pub issuer_uri: String,

    /// Accepted audience values, comma-separated
    #[serde(default)]
    pub audience: String,

    /// JWKS endpoint; derived from the issuer URI when unset
    #[serde(default)]
    pub jwks_uri: Option<String>,

    /// Clock-skew tolerance for exp/nbf checks, in seconds (default: 60)
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,

    /// How long a fetched key set stays fresh, in seconds (default: 300)
    #[serde(default = "default_keys_ttl_secs")]
    pub keys_ttl_secs: u64,

    /// Minimum spacing between refreshes for one unknown key id, in seconds
    /// (default: 30)
    #[serde(default = "default_keys_cooldown_secs")]
    pub keys_cooldown_secs: u64,

    /// Timeout for JWKS fetches, in seconds (default: 5)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Optional scope-implication table: a granted scope also satisfies every
    /// scope it maps to
    #[serde(default)]
    pub scope_implications: HashMap<String, Vec<String>>,
}

pub(crate) fn default_clock_skew_secs() -> u64 {
    60
}

pub(crate) fn default_keys_ttl_secs() -> u64 {
    300
}

pub(crate) fn default_keys_cooldown_secs() -> u64 {
    30
}

pub(crate) fn default_fetch_timeout_secs() -> u64 {
    5
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            issuer_uri: "".to_string(),
            audience: "".to_string(),
            jwks_uri: None,
            clock_skew_secs: default_clock_skew_secs(),
            keys_ttl_secs: default_keys_ttl_secs(),
            keys_cooldown_secs: default_keys_cooldown_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            scope_implications: HashMap::new(),
        }
    }
}

impl AuthSettings {
    /// Accepted audiences as a list, empty entries dropped.
    pub fn audiences(&self) -> Vec<String> {
        self.audience
            .split(',')
            .map(str::trim)
            .filter(|aud| !aud.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The JWKS endpoint to fetch verification keys from.
    pub fn jwks_url(&self) -> Result<Url, url::ParseError> {
        match &self.jwks_uri {
            Some(uri) => Url::parse(uri),
            None => Url::parse(&format!(
                "{}/.well-known/jwks.json",
                self.issuer_uri.trim_end_matches('/')
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audiences_split_on_commas_and_trim() {
        let settings = AuthSettings {
            audience: "profiles-api, reporting-api,, ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.audiences(),
            vec!["profiles-api".to_string(), "reporting-api".to_string()]
        );
    }

    #[test]
    fn jwks_url_is_derived_from_the_issuer_when_unset() {
        let settings = AuthSettings {
            issuer_uri: "https://issuer.test/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.jwks_url().unwrap().as_str(),
            "https://issuer.test/.well-known/jwks.json"
        );
    }

    #[test]
    fn explicit_jwks_uri_wins() {
        let settings = AuthSettings {
            issuer_uri: "https://issuer.test".to_string(),
            jwks_uri: Some("https://keys.test/jwks.json".to_string()),
            ..Default::default()
        };
        assert_eq!(
            settings.jwks_url().unwrap().as_str(),
            "https://keys.test/jwks.json"
        );
    }

    #[test]
    fn defaults_are_conservative() {
        let settings = AuthSettings::default();
        assert_eq!(settings.clock_skew_secs, 60);
        assert_eq!(settings.keys_ttl_secs, 300);
        assert_eq!(settings.keys_cooldown_secs, 30);
        assert_eq!(settings.fetch_timeout_secs, 5);
        assert!(settings.scope_implications.is_empty());
    }
}

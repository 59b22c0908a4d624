use crate::api::profiles::ProfileStore;
use crate::config::Settings;
use authz_engine::{
    HttpJwksFetcher, KeyStore, PolicyEngine, RequestGate, TokenValidator, ValidatorConfig,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub gate: Arc<RequestGate>,
    pub profiles: Arc<ProfileStore>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, std::io::Error> {
        let jwks_url = settings.auth.jwks_url().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid JWKS URL: {e}"),
            )
        })?;

        let fetcher =
            HttpJwksFetcher::new(jwks_url, Duration::from_secs(settings.auth.fetch_timeout_secs))
                .map_err(|e| {
                    std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("Failed to create JWKS client: {e}"),
                    )
                })?;
        let keys = Arc::new(KeyStore::new(
            Arc::new(fetcher),
            Duration::from_secs(settings.auth.keys_ttl_secs),
            Duration::from_secs(settings.auth.keys_cooldown_secs),
        ));

        let validator = TokenValidator::new(
            ValidatorConfig {
                issuer: settings.auth.issuer_uri.clone(),
                audiences: settings.auth.audiences(),
                leeway: Duration::from_secs(settings.auth.clock_skew_secs),
            },
            keys,
        );
        let policy = PolicyEngine::with_implications(settings.auth.scope_implications.clone());

        Ok(Self {
            settings: Arc::new(settings),
            gate: Arc::new(RequestGate::new(validator, policy)),
            profiles: Arc::new(ProfileStore::new()),
        })
    }
}

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use log::{debug, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Errors that can occur while fetching a JWKS document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("jwks request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("jwks endpoint returned status {0}")]
    Status(u16),
    #[error("failed to parse jwks document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of verification keys. The production implementation fetches a JWKS
/// document over HTTPS; tests inject counting or failing fetchers.
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, FetchError>;
}

/// Fetches the JWKS document from a remote endpoint.
///
/// The client carries its own request and connect timeouts: the fetch is the
/// only suspension point in the validation path and must stay time-bounded.
pub struct HttpJwksFetcher {
    client: Client,
    url: Url,
}

impl HttpJwksFetcher {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    async fn fetch(&self) -> Result<JwkSet, FetchError> {
        debug!("fetching jwks from {}", self.url);
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// A single verification key with the algorithm it is pinned to.
pub struct VerificationKey {
    pub algorithm: Algorithm,
    pub key: DecodingKey,
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("VerificationKey")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

struct Snapshot {
    keys: HashMap<String, Arc<VerificationKey>>,
    fetched_at: Option<Instant>,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at
            .is_some_and(|fetched_at| fetched_at.elapsed() < ttl)
    }
}

struct RefreshState {
    attempts: HashMap<String, Instant>,
}

impl RefreshState {
    fn attempted_recently(&self, kid: &str, cooldown: Duration) -> bool {
        self.attempts
            .get(kid)
            .is_some_and(|at| at.elapsed() < cooldown)
    }

    fn mark(&mut self, kid: &str, cooldown: Duration) {
        self.attempts.retain(|_, at| at.elapsed() < cooldown);
        self.attempts.insert(kid.to_string(), Instant::now());
    }
}

/// Kid-indexed set of trusted verification keys, shared read-only across
/// concurrent requests.
///
/// The snapshot is refreshed when it goes stale (TTL) or when an unknown kid
/// is encountered. Refreshes are serialized through a single mutex, so
/// concurrent requests hitting the same unknown kid cause exactly one fetch:
/// waiters queue on the mutex and re-check the snapshot once it is theirs.
/// A per-kid cooldown bounds refresh storms for kids that stay unknown.
/// Fetch failures keep the last-known-good snapshot and fail closed.
pub struct KeyStore {
    fetcher: Arc<dyn JwksFetcher>,
    ttl: Duration,
    cooldown: Duration,
    snapshot: RwLock<Snapshot>,
    refresh: Mutex<RefreshState>,
}

impl KeyStore {
    pub fn new(fetcher: Arc<dyn JwksFetcher>, ttl: Duration, cooldown: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            cooldown,
            snapshot: RwLock::new(Snapshot {
                keys: HashMap::new(),
                fetched_at: None,
            }),
            refresh: Mutex::new(RefreshState {
                attempts: HashMap::new(),
            }),
        }
    }

    /// Resolves a verification key by its key id, refreshing the key set if
    /// the refresh policy allows. `None` means the kid is not trusted: the
    /// caller must fail closed.
    pub async fn resolve(&self, kid: &str) -> Option<Arc<VerificationKey>> {
        {
            let snapshot = self.snapshot.read().await;
            if snapshot.is_fresh(self.ttl) {
                if let Some(key) = snapshot.keys.get(kid) {
                    return Some(key.clone());
                }
            }
        }

        let mut refresh = self.refresh.lock().await;

        // A refresh that completed while we waited for the lock may already
        // have settled this kid.
        {
            let snapshot = self.snapshot.read().await;
            if snapshot.is_fresh(self.ttl) {
                if let Some(key) = snapshot.keys.get(kid) {
                    return Some(key.clone());
                }
                if refresh.attempted_recently(kid, self.cooldown) {
                    return None;
                }
            }
        }

        if refresh.attempted_recently(kid, self.cooldown) {
            // Within the cooldown window: no second fetch for this kid.
            // Fall back to the last-known-good snapshot.
            return self.snapshot.read().await.keys.get(kid).cloned();
        }
        refresh.mark(kid, self.cooldown);

        match self.fetcher.fetch().await {
            Ok(jwk_set) => {
                let keys = decode_jwk_set(&jwk_set);
                debug!("jwks refresh installed {} keys", keys.len());
                let mut snapshot = self.snapshot.write().await;
                snapshot.keys = keys;
                snapshot.fetched_at = Some(Instant::now());
            }
            Err(err) => {
                warn!("jwks refresh failed, keeping last known keys: {err}");
            }
        }

        self.snapshot.read().await.keys.get(kid).cloned()
    }
}

fn decode_jwk_set(jwk_set: &JwkSet) -> HashMap<String, Arc<VerificationKey>> {
    let mut keys = HashMap::new();
    for jwk in &jwk_set.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            warn!("skipping jwks entry without a kid");
            continue;
        };
        let Some(algorithm) = key_algorithm(jwk) else {
            warn!("skipping jwks entry '{kid}' with unsupported algorithm");
            continue;
        };
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid, Arc::new(VerificationKey { algorithm, key }));
            }
            Err(err) => {
                warn!("skipping unusable jwks entry '{kid}': {err}");
            }
        }
    }
    keys
}

fn key_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    if let Some(alg) = jwk.common.key_algorithm {
        return match alg {
            KeyAlgorithm::HS256 => Some(Algorithm::HS256),
            KeyAlgorithm::HS384 => Some(Algorithm::HS384),
            KeyAlgorithm::HS512 => Some(Algorithm::HS512),
            KeyAlgorithm::RS256 => Some(Algorithm::RS256),
            KeyAlgorithm::RS384 => Some(Algorithm::RS384),
            KeyAlgorithm::RS512 => Some(Algorithm::RS512),
            KeyAlgorithm::PS256 => Some(Algorithm::PS256),
            KeyAlgorithm::PS384 => Some(Algorithm::PS384),
            KeyAlgorithm::PS512 => Some(Algorithm::PS512),
            KeyAlgorithm::ES256 => Some(Algorithm::ES256),
            KeyAlgorithm::ES384 => Some(Algorithm::ES384),
            KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
            _ => None,
        };
    }
    // No alg in the JWK; infer a conservative default from the key type.
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Some(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(params) => match &params.curve {
            EllipticCurve::P256 => Some(Algorithm::ES256),
            EllipticCurve::P384 => Some(Algorithm::ES384),
            _ => None,
        },
        AlgorithmParameters::OctetKeyPair(params) => match &params.curve {
            EllipticCurve::Ed25519 => Some(Algorithm::EdDSA),
            _ => None,
        },
        AlgorithmParameters::OctetKey(_) => Some(Algorithm::HS256),
    }
}

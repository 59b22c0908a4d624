use crate::claims::ClaimSet;
use crate::error::ValidationError;
use crate::keys::KeyStore;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode, decode_header};
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Trust configuration for token validation.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Expected `iss` claim; compared for exact equality.
    pub issuer: String,
    /// Accepted `aud` values; the token's audience must contain one of them
    /// exactly. No prefix or substring matching.
    pub audiences: Vec<String>,
    /// Clock-skew tolerance applied to `exp` and `nbf`.
    pub leeway: Duration,
}

/// Verifies bearer tokens against the trusted key set and produces the
/// validated claim set.
pub struct TokenValidator {
    config: ValidatorConfig,
    keys: Arc<KeyStore>,
}

impl TokenValidator {
    pub fn new(config: ValidatorConfig, keys: Arc<KeyStore>) -> Self {
        Self { config, keys }
    }

    /// Validates a token end to end.
    ///
    /// Order matters: structure first, then the temporal claims from the
    /// undecoded payload, then key resolution and signature, then issuer and
    /// audience. Checking expiry before the signature means an expired token
    /// reports `Expired` no matter what it was signed with; nothing from the
    /// payload is trusted until the signature check has passed.
    pub async fn validate(&self, token: &str) -> Result<ClaimSet, ValidationError> {
        let header = decode_header(token).map_err(|_| ValidationError::Malformed)?;
        let unverified = decode_claims_unverified(token)?;

        let now = Utc::now().timestamp();
        let leeway = self.config.leeway.as_secs() as i64;
        if let Some(exp) = unverified.exp {
            if exp + leeway <= now {
                return Err(ValidationError::Expired);
            }
        }
        if let Some(nbf) = unverified.nbf {
            if nbf - leeway > now {
                return Err(ValidationError::NotYetValid);
            }
        }

        let kid = header.kid.ok_or(ValidationError::Malformed)?;
        let key = self
            .keys
            .resolve(&kid)
            .await
            .ok_or(ValidationError::UnknownKey { kid })?;

        // Temporal checks are already done above; pin the algorithm to the
        // resolved key so an attacker cannot pick a weaker one.
        let mut validation = Validation::new(key.algorithm);
        validation.leeway = self.config.leeway.as_secs();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let verified = decode::<ClaimSet>(token, &key.key, &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    ValidationError::BadSignature
                }
                ErrorKind::ExpiredSignature => ValidationError::Expired,
                ErrorKind::ImmatureSignature => ValidationError::NotYetValid,
                _ => ValidationError::Malformed,
            })?;
        let claims = verified.claims;

        match claims.iss.as_deref() {
            Some(iss) if iss == self.config.issuer => {}
            _ => return Err(ValidationError::IssuerMismatch),
        }

        let audience_accepted = claims.aud.as_ref().is_some_and(|aud| {
            self.config
                .audiences
                .iter()
                .any(|expected| aud.contains(expected))
        });
        if !audience_accepted {
            return Err(ValidationError::AudienceMismatch);
        }

        debug!("token validated for subject {:?}", claims.sub);
        Ok(claims)
    }
}

fn decode_claims_unverified(token: &str) -> Result<ClaimSet, ValidationError> {
    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ValidationError::Malformed);
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ValidationError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| ValidationError::Malformed)
}

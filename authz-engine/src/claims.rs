use crate::error::MappingError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Claims carried by a validated access token.
///
/// Produced once per request by the validator and immutable afterwards.
/// `aud` and the scope claim keep their wire shape here (string or array);
/// normalization happens at the mapping boundary so raw claim shapes never
/// propagate further.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClaimSet {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    /// Granted scopes; `scp` is accepted as an alias of `scope`.
    #[serde(default, alias = "scp")]
    pub scope: Option<ScopeClaim>,
    /// Any claims this core does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The `aud` claim can be either a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// Exact string membership; no prefix or substring matching.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// The scope claim as issuers emit it: a space-delimited string or a
/// sequence of strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScopeClaim {
    Delimited(String),
    List(Vec<String>),
}

impl ScopeClaim {
    /// Normalizes into the canonical set-of-string representation.
    /// Duplicates collapse; comparison stays case-sensitive.
    pub fn to_set(&self) -> BTreeSet<String> {
        match self {
            ScopeClaim::Delimited(raw) => raw
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            ScopeClaim::List(items) => items
                .iter()
                .filter(|item| !item.is_empty())
                .cloned()
                .collect(),
        }
    }
}

/// The request-scoped authorization context derived from a validated
/// [`ClaimSet`].
///
/// Only [`to_context`] constructs one, so a context can never originate from
/// an unvalidated token. Attached to the request by the HTTP layer after the
/// gate allows and dropped at request end.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationContext {
    pub subject: String,
    pub scopes: BTreeSet<String>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationContext {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

/// Derives an [`AuthorizationContext`] from a validated claim set.
///
/// The subject and expiry are required; a token without them is unusable for
/// authorization even when its signature checks out.
pub fn to_context(claims: &ClaimSet) -> Result<AuthorizationContext, MappingError> {
    let subject = match claims.sub.as_deref() {
        Some(sub) if !sub.trim().is_empty() => sub.to_string(),
        _ => return Err(MappingError::MissingSubject),
    };

    let expires_at = claims
        .exp
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
        .ok_or(MappingError::MissingExpiry)?;

    let scopes = claims
        .scope
        .as_ref()
        .map(ScopeClaim::to_set)
        .unwrap_or_default();

    Ok(AuthorizationContext {
        subject,
        scopes,
        expires_at,
    })
}

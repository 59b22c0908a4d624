use http::StatusCode;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors produced while verifying a bearer token against the trusted key set.
///
/// Every variant is terminal for the request it occurred in; there is no
/// partial trust. Key-refresh I/O failures surface as [`UnknownKey`]
/// (fail closed), never as an implicit allow.
///
/// [`UnknownKey`]: ValidationError::UnknownKey
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed token")]
    Malformed,
    #[error("no trusted key with id '{kid}'")]
    UnknownKey { kid: String },
    #[error("signature verification failed")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("issuer does not match the expected value")]
    IssuerMismatch,
    #[error("audience does not match any expected value")]
    AudienceMismatch,
}

/// Errors produced while deriving an authorization context from a validated
/// claim set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("token has no usable 'sub' claim")]
    MissingSubject,
    #[error("token has no usable 'exp' claim")]
    MissingExpiry,
}

/// Why the decision engine denied an otherwise valid credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("authorization context has expired")]
    ContextExpired,
    #[error("insufficient scope, missing [{}]", join_scopes(.0))]
    MissingScopes(BTreeSet<String>),
}

fn join_scopes(scopes: &BTreeSet<String>) -> String {
    scopes
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Terminal outcome of the request gate when a request is not allowed
/// through.
///
/// The variant discriminates the HTTP contract the caller must honor:
/// [`status`] returns 401 when no credential was presented or the presented
/// credential is invalid, and 403 when a valid credential lacks the required
/// permission.
///
/// [`status`]: Denial::status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    /// No bearer credential was presented. This is an expected state for
    /// anonymous callers, distinct from an invalid credential.
    #[error("no bearer credential presented")]
    MissingCredential,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Unmappable(#[from] MappingError),
    #[error(transparent)]
    Refused(#[from] DenyReason),
}

impl Denial {
    /// The HTTP status this denial maps to at the boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            Denial::Refused(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// The gate stage that produced this denial, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Denial::MissingCredential => "extract",
            Denial::Invalid(_) => "validate",
            Denial::Unmappable(_) => "map",
            Denial::Refused(_) => "decide",
        }
    }
}

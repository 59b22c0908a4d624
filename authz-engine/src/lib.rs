//! # authz-engine
//!
//! Bearer-token authorization core for an OAuth2 resource server.
//!
//! ## Components
//!
//! - **Extractor:** pulls the bearer token out of the `Authorization` header.
//! - **Key store:** kid-indexed verification keys from a JWKS endpoint, with
//!   single-flight refresh and fail-closed error handling.
//! - **Validator:** signature, temporal, issuer and audience checks producing
//!   an immutable claim set.
//! - **Claim mapper:** derives the request-scoped authorization context.
//! - **Decision engine:** evaluates scope requirements against the context.
//! - **Request gate:** orchestrates the pipeline per request and exposes the
//!   401-vs-403 denial contract to the HTTP layer.

pub mod claims;
pub mod decision;
pub mod error;
pub mod extract;
pub mod gate;
pub mod keys;
pub mod validator;

pub use claims::{AuthorizationContext, ClaimSet};
pub use decision::{AccessDecision, PolicyEngine, Requirement};
pub use error::{Denial, DenyReason, MappingError, ValidationError};
pub use gate::RequestGate;
pub use keys::{HttpJwksFetcher, JwksFetcher, KeyStore};
pub use validator::{TokenValidator, ValidatorConfig};

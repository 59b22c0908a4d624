use crate::claims::{self, AuthorizationContext};
use crate::decision::{AccessDecision, PolicyEngine, Requirement};
use crate::error::Denial;
use crate::extract;
use crate::validator::TokenValidator;
use http::HeaderMap;
use log::debug;

/// Orchestrates the per-request authorization pipeline:
/// extract → validate → map → decide.
///
/// The first failure short-circuits into a terminal [`Denial`]; there are no
/// retries here (retry policy belongs to the key store's refresh handling).
/// The returned context is handed to the HTTP layer only after an allow, so
/// a request cancelled mid-pipeline leaves no partial context behind.
pub struct RequestGate {
    validator: TokenValidator,
    policy: PolicyEngine,
}

impl RequestGate {
    pub fn new(validator: TokenValidator, policy: PolicyEngine) -> Self {
        Self { validator, policy }
    }

    /// Runs the pipeline for one request against the given requirement.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        requirement: &Requirement,
    ) -> Result<AuthorizationContext, Denial> {
        let token = extract::bearer_token(headers).ok_or(Denial::MissingCredential)?;

        let claim_set = self.validator.validate(token).await?;

        let context = claims::to_context(&claim_set)?;

        match self.policy.decide(&context, requirement) {
            AccessDecision::Allow => {
                debug!("request allowed for subject '{}'", context.subject);
                Ok(context)
            }
            AccessDecision::Deny(reason) => Err(Denial::Refused(reason)),
        }
    }
}

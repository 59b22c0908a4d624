use crate::claims::AuthorizationContext;
use crate::error::DenyReason;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};

/// The permission a route demands, expressed over scope names.
///
/// A requirement is a conjunction of groups: every group must be satisfied
/// (AND semantics, the default), and a group is satisfied when any one of
/// its members is granted. A single-member group is therefore a plain
/// required scope; a larger group is an explicit any-of alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    groups: Vec<BTreeSet<String>>,
}

impl Requirement {
    /// A single required scope.
    pub fn scope(scope: impl Into<String>) -> Self {
        Self {
            groups: vec![BTreeSet::from([scope.into()])],
        }
    }

    /// All of the given scopes are required.
    pub fn all<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: scopes
                .into_iter()
                .map(|scope| BTreeSet::from([scope.into()]))
                .collect(),
        }
    }

    /// Any one of the given scopes satisfies the requirement.
    pub fn any_of<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: vec![scopes.into_iter().map(Into::into).collect()],
        }
    }

    /// Additionally require the given scope.
    pub fn and(mut self, scope: impl Into<String>) -> Self {
        self.groups.push(BTreeSet::from([scope.into()]));
        self
    }

    /// Additionally require any one of the given scopes.
    pub fn and_any_of<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.push(scopes.into_iter().map(Into::into).collect());
        self
    }
}

/// Outcome of evaluating a requirement against an authorization context.
/// Computed per request and never cached: policy and claims may change at
/// any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// Evaluates requirements against granted scopes.
///
/// Scopes have no implicit wildcard or hierarchy. The only way one scope can
/// satisfy another is through the explicitly configured implication table,
/// which is transitively closed at construction.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    implied: HashMap<String, BTreeSet<String>>,
}

impl PolicyEngine {
    /// An engine with no scope implications.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with the given implication table (granted scope → scopes it
    /// also satisfies). The closure is computed here so evaluation stays a
    /// set lookup.
    pub fn with_implications(table: HashMap<String, Vec<String>>) -> Self {
        let mut implied: HashMap<String, BTreeSet<String>> = HashMap::new();
        for granted in table.keys() {
            let mut reachable = BTreeSet::new();
            let mut frontier = vec![granted.clone()];
            while let Some(scope) = frontier.pop() {
                if let Some(next) = table.get(&scope) {
                    for implied_scope in next {
                        if implied_scope != granted && reachable.insert(implied_scope.clone()) {
                            frontier.push(implied_scope.clone());
                        }
                    }
                }
            }
            implied.insert(granted.clone(), reachable);
        }
        Self { implied }
    }

    fn satisfies(&self, granted: &BTreeSet<String>, required: &str) -> bool {
        if granted.contains(required) {
            return true;
        }
        granted.iter().any(|scope| {
            self.implied
                .get(scope)
                .is_some_and(|implied| implied.contains(required))
        })
    }

    /// Evaluates a requirement against a context.
    ///
    /// Denies when the context has expired at evaluation time, or when any
    /// group is left unsatisfied; the members of every unsatisfied group are
    /// reported as missing.
    pub fn decide(
        &self,
        context: &AuthorizationContext,
        requirement: &Requirement,
    ) -> AccessDecision {
        if context.expires_at <= Utc::now() {
            return AccessDecision::Deny(DenyReason::ContextExpired);
        }

        let mut missing = BTreeSet::new();
        for group in &requirement.groups {
            let satisfied = group
                .iter()
                .any(|required| self.satisfies(&context.scopes, required));
            if !satisfied {
                missing.extend(group.iter().cloned());
            }
        }

        if missing.is_empty() {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(DenyReason::MissingScopes(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn context(scopes: &[&str]) -> AuthorizationContext {
        AuthorizationContext {
            subject: "subject-1".to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expires_at: Utc::now() + Duration::minutes(5),
        }
    }

    #[test]
    fn superset_of_required_scopes_is_allowed() {
        let engine = PolicyEngine::new();
        let ctx = context(&["message.read", "message.write", "admin"]);
        let requirement = Requirement::all(["message.read", "message.write"]);
        assert_eq!(engine.decide(&ctx, &requirement), AccessDecision::Allow);
    }

    #[test]
    fn removing_any_required_scope_flips_to_deny() {
        let engine = PolicyEngine::new();
        let requirement = Requirement::all(["message.read", "message.write"]);

        for kept in ["message.read", "message.write"] {
            let ctx = context(&[kept]);
            let expected_missing = if kept == "message.read" {
                "message.write"
            } else {
                "message.read"
            };
            assert_eq!(
                engine.decide(&ctx, &requirement),
                AccessDecision::Deny(DenyReason::MissingScopes(BTreeSet::from([
                    expected_missing.to_string()
                ])))
            );
        }
    }

    #[test]
    fn any_of_group_accepts_either_scope() {
        let engine = PolicyEngine::new();
        let requirement = Requirement::any_of(["message.read", "message.admin"]);

        assert!(engine.decide(&context(&["message.read"]), &requirement).is_allowed());
        assert!(engine.decide(&context(&["message.admin"]), &requirement).is_allowed());
        assert!(!engine.decide(&context(&["other"]), &requirement).is_allowed());
    }

    #[test]
    fn unsatisfied_any_of_group_reports_all_alternatives() {
        let engine = PolicyEngine::new();
        let requirement =
            Requirement::scope("message.read").and_any_of(["message.write", "message.admin"]);
        let decision = engine.decide(&context(&["message.read"]), &requirement);
        assert_eq!(
            decision,
            AccessDecision::Deny(DenyReason::MissingScopes(BTreeSet::from([
                "message.admin".to_string(),
                "message.write".to_string(),
            ])))
        );
    }

    #[test]
    fn expired_context_is_denied_regardless_of_scopes() {
        let engine = PolicyEngine::new();
        let ctx = AuthorizationContext {
            subject: "subject-1".to_string(),
            scopes: BTreeSet::from(["message.read".to_string()]),
            expires_at: Utc::now() - Duration::seconds(1),
        };
        assert_eq!(
            engine.decide(&ctx, &Requirement::scope("message.read")),
            AccessDecision::Deny(DenyReason::ContextExpired)
        );
    }

    #[test]
    fn scopes_are_compared_case_sensitively() {
        let engine = PolicyEngine::new();
        let decision = engine.decide(
            &context(&["Message.Read"]),
            &Requirement::scope("message.read"),
        );
        assert!(!decision.is_allowed());
    }

    #[test]
    fn implication_table_is_transitively_closed() {
        let engine = PolicyEngine::with_implications(HashMap::from([
            (
                "admin".to_string(),
                vec!["message.write".to_string()],
            ),
            (
                "message.write".to_string(),
                vec!["message.read".to_string()],
            ),
        ]));

        let ctx = context(&["admin"]);
        assert!(engine
            .decide(&ctx, &Requirement::all(["message.read", "message.write"]))
            .is_allowed());

        // The table is directional: read does not imply write.
        let reader = context(&["message.read"]);
        assert!(!engine
            .decide(&reader, &Requirement::scope("message.write"))
            .is_allowed());
    }

    #[test]
    fn no_implicit_hierarchy_without_a_table() {
        let engine = PolicyEngine::new();
        let ctx = context(&["admin"]);
        assert!(!engine
            .decide(&ctx, &Requirement::scope("message.read"))
            .is_allowed());
    }
}

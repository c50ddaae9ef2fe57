//! Authorization decision document returned to the gateway.

use serde::{Deserialize, Serialize};

/// Policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The single action this authorizer guards.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Resource pattern granted or denied.
pub const ANY_RESOURCE: &str = "*";

/// Principal reported on every Deny.
pub const ANONYMOUS_PRINCIPAL: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

/// Decision for one request.
///
/// A Deny is identical whatever the failure was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

impl AuthorizationDecision {
    /// Grant the invoke action to `principal_id`.
    pub fn allow(principal_id: &str) -> Self {
        Self::new(principal_id, Effect::Allow)
    }

    /// The generic denial.
    pub fn deny() -> Self {
        Self::new(ANONYMOUS_PRINCIPAL, Effect::Deny)
    }

    fn new(principal_id: &str, effect: Effect) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![Statement {
                    action: INVOKE_ACTION.to_string(),
                    effect,
                    resource: ANY_RESOURCE.to_string(),
                }],
            },
        }
    }

    /// Effect of the decision. A document without statements denies.
    pub fn effect(&self) -> Effect {
        self.policy_document
            .statement
            .first()
            .map_or(Effect::Deny, |statement| statement.effect)
    }

    pub fn is_allow(&self) -> bool {
        self.effect() == Effect::Allow
    }
}

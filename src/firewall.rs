//! Managed firewall rule model and the edge-firewall capability.

use crate::RotationConfig;
use crate::Result;
use async_trait::async_trait;

/// Action taken by a firewall rule when its statement matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Admit the request.
    Allow,
    /// Reject the request.
    Block,
    /// Count the match without affecting the request.
    Count,
}

/// One exact match against the managed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    /// Header name matched case-sensitively.
    pub header: String,
    /// Value the header must equal exactly.
    pub value: String,
}

/// The verification rule installed in front of the origin: admit a request
/// when the managed header equals any of the listed values.
///
/// During a rotation the rule carries two matches, the pending and the
/// current value, so that requests using either header are admitted while
/// the distribution change propagates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRule {
    /// Rule name, derived from the stack prefix.
    pub name: String,
    /// Metric name attached to the rule.
    pub metric_name: String,
    /// Fixed priority slot the rule occupies.
    pub priority: i32,
    /// Action on match.
    pub action: RuleAction,
    /// Accepted header values, in OR.
    pub matches: Vec<HeaderMatch>,
}

impl VerifyRule {
    /// Builds the rule for a rotation in flight: accept both the pending and
    /// the current header value.
    pub fn for_rotation(config: &RotationConfig, pending: &str, current: &str) -> Self {
        let matches = [pending, current]
            .into_iter()
            .map(|value| HeaderMatch {
                header: config.header_name.clone(),
                value: value.to_string(),
            })
            .collect();

        Self {
            name: config.rule_name(),
            metric_name: config.metric_name(),
            priority: config.rule_priority,
            action: RuleAction::Allow,
            matches,
        }
    }

    /// Whether an existing rule must be dropped before this rule is
    /// inserted.
    ///
    /// A rule collides when it occupies the managed priority slot or when it
    /// carries the managed name at any priority; filtering on both keeps
    /// rule names unique, so a leftover rule from a partial earlier run can
    /// never survive alongside the fresh one.
    pub fn displaces(&self, name: &str, priority: i32) -> bool {
        priority == self.priority || name == self.name
    }
}

/// Firewall capability consumed by the SET phase.
#[async_trait]
pub trait EdgeFirewall: Send + Sync {
    /// Replaces the managed verification rule in the policy, preserving
    /// every other rule unchanged.
    ///
    /// Implementations read the policy together with its
    /// optimistic-concurrency token and write back under the same token.
    ///
    /// # Errors
    ///
    /// - [`RotationError::ConcurrentModification`](crate::RotationError::ConcurrentModification):
    ///   the token went stale between read and write
    /// - [`RotationError::ExternalUpdateFailed`](crate::RotationError::ExternalUpdateFailed):
    ///   the control plane rejected the write for any other reason
    async fn put_rule(&self, rule: &VerifyRule) -> Result<()>;
}

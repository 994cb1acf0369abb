//! WAFv2 implementation of the edge firewall.

use crate::firewall::{EdgeFirewall, HeaderMatch, RuleAction, VerifyRule};
use crate::{Result, RotationConfig, RotationError};
use async_trait::async_trait;
use aws_sdk_wafv2::primitives::Blob;
use aws_sdk_wafv2::types::{
    AllowAction, BlockAction, ByteMatchStatement, CountAction, FieldToMatch, OrStatement,
    PositionalConstraint, Rule, RuleAction as WafRuleAction, Scope, SingleHeader, Statement,
    TextTransformation, TextTransformationType, VisibilityConfig,
};
use aws_sdk_wafv2::Client;

/// Edge firewall backed by a regional WAFv2 web ACL.
///
/// The managed verification rule lives in the web ACL named in the
/// configuration; `put_rule` replaces it wholesale while carrying every
/// other rule through unchanged, under the ACL's lock token.
pub struct AwsEdgeFirewall {
    client: Client,
    acl_name: String,
    acl_id: String,
}

impl AwsEdgeFirewall {
    /// Wraps an existing client.
    pub fn new(client: Client, config: &RotationConfig) -> Self {
        Self {
            client,
            acl_name: config.acl_name.clone(),
            acl_id: config.acl_id.clone(),
        }
    }

    /// Builds a firewall adapter from the default credential chain.
    pub async fn from_env(config: &RotationConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(Client::new(&sdk_config), config)
    }
}

fn build_err(e: impl std::fmt::Display) -> RotationError {
    RotationError::external("waf", format!("building rule: {e}"))
}

/// One exact byte-match of the managed header against a candidate value.
fn header_statement(header_match: &HeaderMatch) -> Result<Statement> {
    let byte_match = ByteMatchStatement::builder()
        .field_to_match(
            FieldToMatch::builder()
                .single_header(
                    SingleHeader::builder()
                        .name(&header_match.header)
                        .build()
                        .map_err(build_err)?,
                )
                .build(),
        )
        .positional_constraint(PositionalConstraint::Exactly)
        .search_string(Blob::new(header_match.value.as_bytes()))
        .text_transformations(
            TextTransformation::builder()
                .priority(0)
                .r#type(TextTransformationType::None)
                .build()
                .map_err(build_err)?,
        )
        .build()
        .map_err(build_err)?;

    Ok(Statement::builder().byte_match_statement(byte_match).build())
}

/// Translates the typed rule record into its WAFv2 shape.
fn waf_rule(rule: &VerifyRule) -> Result<Rule> {
    let statements = rule
        .matches
        .iter()
        .map(header_statement)
        .collect::<Result<Vec<_>>>()?;

    let statement = Statement::builder()
        .or_statement(
            OrStatement::builder()
                .set_statements(Some(statements))
                .build()
                .map_err(build_err)?,
        )
        .build();

    let action = match rule.action {
        RuleAction::Allow => WafRuleAction::builder().allow(AllowAction::builder().build()),
        RuleAction::Block => WafRuleAction::builder().block(BlockAction::builder().build()),
        RuleAction::Count => WafRuleAction::builder().count(CountAction::builder().build()),
    }
    .build();

    Rule::builder()
        .name(&rule.name)
        .priority(rule.priority)
        .action(action)
        .statement(statement)
        .visibility_config(
            VisibilityConfig::builder()
                .sampled_requests_enabled(true)
                .cloud_watch_metrics_enabled(true)
                .metric_name(&rule.metric_name)
                .build()
                .map_err(build_err)?,
        )
        .build()
        .map_err(build_err)
}

#[async_trait]
impl EdgeFirewall for AwsEdgeFirewall {
    async fn put_rule(&self, rule: &VerifyRule) -> Result<()> {
        let response = self
            .client
            .get_web_acl()
            .name(&self.acl_name)
            .scope(Scope::Regional)
            .id(&self.acl_id)
            .send()
            .await
            .map_err(|e| RotationError::external("waf", format!("get_web_acl: {e}")))?;

        let lock_token = response.lock_token.clone().ok_or_else(|| {
            RotationError::external("waf", format!("web ACL {} returned no lock token", self.acl_id))
        })?;
        let web_acl = response.web_acl.ok_or_else(|| {
            RotationError::external("waf", format!("web ACL {} not found", self.acl_id))
        })?;

        // The fresh rule goes first; every existing rule is carried through
        // unless it occupies the managed slot (by priority or by name).
        let mut rules = vec![waf_rule(rule)?];
        for existing in web_acl.rules() {
            if !rule.displaces(existing.name(), existing.priority()) {
                rules.push(existing.clone());
            }
        }

        tracing::info!(acl_id = %self.acl_id, rule = %rule.name, "updating web ACL");
        self.client
            .update_web_acl()
            .name(&self.acl_name)
            .scope(Scope::Regional)
            .id(&self.acl_id)
            .set_default_action(web_acl.default_action.clone())
            .set_description(web_acl.description.clone())
            .set_visibility_config(web_acl.visibility_config.clone())
            .lock_token(lock_token)
            .set_rules(Some(rules))
            .send()
            .await
            .map_err(|e| {
                let text = e.to_string();
                if text.contains("WAFOptimisticLockException") {
                    RotationError::ConcurrentModification(format!(
                        "web ACL {}: {text}",
                        self.acl_id
                    ))
                } else {
                    RotationError::external("waf", format!("update_web_acl: {text}"))
                }
            })?;

        Ok(())
    }
}

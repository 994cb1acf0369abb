//! The four-step rotation state machine.
//!
//! An external scheduler invokes [`Rotation::execute_step`] once per
//! lifecycle step. The state machine holds no state of its own between
//! invocations; everything durable lives in the secret store's version
//! metadata, the firewall policy, and the distribution configuration.

use crate::distribution::Distribution;
use crate::firewall::{EdgeFirewall, VerifyRule};
use crate::probe::OriginProbe;
use crate::secret::{SecretMetadata, SecretValue, Staged, VersionStage};
use crate::store::SecretStore;
use crate::wait::Propagation;
use crate::{Result, RotationConfig, RotationError};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// One of the four lifecycle steps, invoked in this fixed order by the
/// scheduler. Any step may be re-invoked after a transient failure; CREATE,
/// SET and TEST are idempotent while the version is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    /// Stage a fresh random value as pending.
    Create,
    /// Push the pending value into both enforcement points.
    Set,
    /// Verify both values against the live origin.
    Test,
    /// Promote the pending version to current.
    Finish,
}

impl RotationStep {
    /// Wire name used by the scheduler.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "createSecret",
            Self::Set => "setSecret",
            Self::Test => "testSecret",
            Self::Finish => "finishSecret",
        }
    }
}

impl FromStr for RotationStep {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "createSecret" => Ok(Self::Create),
            "setSecret" => Ok(Self::Set),
            "testSecret" => Ok(Self::Test),
            "finishSecret" => Ok(Self::Finish),
            other => Err(RotationError::InvalidStep(other.to_string())),
        }
    }
}

impl std::fmt::Display for RotationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduler invocation, as delivered on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RotationRequest {
    /// Secret identifier.
    #[serde(rename = "SecretId")]
    pub secret_id: String,

    /// Version token this rotation is staging.
    #[serde(rename = "ClientRequestToken")]
    pub version: String,

    /// Step name; parsed with [`RotationStep::from_str`].
    #[serde(rename = "Step")]
    pub step: String,
}

/// The rotation state machine over its four collaborators.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use originverify::mock::{
///     CallLog, MockDistribution, MockEdgeFirewall, MockOriginProbe, MockSecretStore,
///     RecordingDelay,
/// };
/// use originverify::{Rotation, RotationConfig, RotationStep};
///
/// #[tokio::main]
/// async fn main() -> originverify::Result<()> {
///     let config = RotationConfig::new("acl", "acl-id", "E2EXAMPLE")
///         .with_origin_url("https://origin.example.com/healthz");
///     let log = CallLog::default();
///
///     let rotation = Rotation::new(
///         config.clone(),
///         Arc::new(MockSecretStore::new("prod/origin-secret")),
///         Arc::new(MockEdgeFirewall::new(log.clone())),
///         Arc::new(MockDistribution::new(&config, log.clone())),
///         Arc::new(MockOriginProbe::default()),
///         Arc::new(RecordingDelay::new(log.clone())),
///     );
///
///     rotation
///         .execute_step("prod/origin-secret", "v1", RotationStep::Create)
///         .await?;
///     Ok(())
/// }
/// ```
pub struct Rotation {
    config: RotationConfig,
    store: Arc<dyn SecretStore>,
    firewall: Arc<dyn EdgeFirewall>,
    distribution: Arc<dyn Distribution>,
    probe: Arc<dyn OriginProbe>,
    propagation: Arc<dyn Propagation>,
}

impl Rotation {
    /// Creates a state machine over the given collaborators.
    pub fn new(
        config: RotationConfig,
        store: Arc<dyn SecretStore>,
        firewall: Arc<dyn EdgeFirewall>,
        distribution: Arc<dyn Distribution>,
        probe: Arc<dyn OriginProbe>,
        propagation: Arc<dyn Propagation>,
    ) -> Self {
        Self {
            config,
            store,
            firewall,
            distribution,
            probe,
            propagation,
        }
    }

    /// Entry point for a wire-shaped scheduler event.
    ///
    /// # Errors
    ///
    /// [`RotationError::InvalidStep`] for an unrecognized step name, plus
    /// anything [`execute_step`](Self::execute_step) can return.
    pub async fn handle(&self, request: &RotationRequest) -> Result<()> {
        let step = request.step.parse()?;
        self.execute_step(&request.secret_id, &request.version, step)
            .await
    }

    /// Executes one lifecycle step for `version` of `secret_id`.
    ///
    /// Guards, evaluated in order before dispatch:
    ///
    /// 1. rotation must be enabled for the secret;
    /// 2. the version must exist among the secret's known versions;
    /// 3. a version already holding the current stage short-circuits to
    ///    success, covering duplicate invocations after FINISH;
    /// 4. otherwise the version must hold the pending stage.
    pub async fn execute_step(
        &self,
        secret_id: &str,
        version: &str,
        step: RotationStep,
    ) -> Result<()> {
        let metadata = self.store.describe(secret_id).await?;

        if !metadata.rotation_enabled {
            return Err(RotationError::RotationDisabled(secret_id.to_string()));
        }

        let Some(stages) = metadata.stages_for(version) else {
            return Err(RotationError::UnknownVersion {
                secret_id: secret_id.to_string(),
                version: version.to_string(),
            });
        };

        if stages.contains(&VersionStage::Current) {
            info!(secret_id, version, "version already set as current");
            return Ok(());
        }

        if !stages.contains(&VersionStage::Pending) {
            return Err(RotationError::InvalidStageForRotation {
                secret_id: secret_id.to_string(),
                version: version.to_string(),
            });
        }

        info!(secret_id, version, step = %step, "executing rotation step");
        match step {
            RotationStep::Create => self.create_secret(secret_id, version).await,
            RotationStep::Set => self.set_secret(secret_id, version, &metadata).await,
            RotationStep::Test => self.test_secret(secret_id, version, &metadata).await,
            RotationStep::Finish => self.finish_secret(secret_id, version, &metadata).await,
        }
    }

    /// CREATE: stage a fresh random value as pending, unless one is already
    /// staged for this version.
    async fn create_secret(&self, secret_id: &str, version: &str) -> Result<()> {
        // The secret must already hold a live value for rotation to make
        // sense at all.
        if self
            .store
            .staged_value(secret_id, None, VersionStage::Current)
            .await?
            == Staged::NotFound
        {
            return Err(RotationError::SecretNotFound(format!(
                "{secret_id} has no current value"
            )));
        }

        match self
            .store
            .staged_value(secret_id, Some(version), VersionStage::Pending)
            .await?
        {
            Staged::Found(_) => {
                info!(secret_id, version, "pending value already staged");
                Ok(())
            }
            Staged::NotFound => {
                let value = SecretValue::new(self.store.random_header_value().await?);
                self.store
                    .put_value(secret_id, version, &value, VersionStage::Pending)
                    .await?;
                info!(secret_id, version, "staged new pending value");
                Ok(())
            }
        }
    }

    /// SET: push the pending value into both enforcement points, firewall
    /// first.
    async fn set_secret(
        &self,
        secret_id: &str,
        version: &str,
        metadata: &SecretMetadata,
    ) -> Result<()> {
        if !self.distribution.is_deployed().await? {
            return Err(RotationError::ResourceNotReady(format!(
                "distribution {} status is not deployed",
                self.config.distribution_id
            )));
        }

        let pending = self
            .require_staged(secret_id, Some(version), VersionStage::Pending)
            .await?;
        let current = self.current_value(secret_id, metadata).await?;

        // The firewall must accept both values before the distribution
        // starts sending the new one; the settle delay covers regional
        // propagation of the rule change.
        let rule =
            VerifyRule::for_rotation(&self.config, &pending.header_value, &current.header_value);
        self.firewall.put_rule(&rule).await?;
        self.propagation.settle().await;
        self.distribution
            .set_header_value(&pending.header_value)
            .await?;

        info!(secret_id, version, "both enforcement points updated");
        Ok(())
    }

    /// TEST: probe the origin once with each value; both must be accepted.
    async fn test_secret(
        &self,
        secret_id: &str,
        version: &str,
        metadata: &SecretMetadata,
    ) -> Result<()> {
        let pending = self
            .require_staged(secret_id, Some(version), VersionStage::Pending)
            .await?;
        let current = self.current_value(secret_id, metadata).await?;

        for value in [&pending.header_value, &current.header_value] {
            if !self.probe.accepts(value).await? {
                return Err(RotationError::VerificationFailed {
                    url: self.config.origin_url.clone(),
                    value: value.clone(),
                });
            }
        }

        info!(secret_id, version, "origin accepted both header values");
        Ok(())
    }

    /// FINISH: move the current stage to this version, demoting the prior
    /// holder. The only phase that mutates stage assignment.
    async fn finish_secret(
        &self,
        secret_id: &str,
        version: &str,
        metadata: &SecretMetadata,
    ) -> Result<()> {
        // The already-current case was short-circuited by the global guard,
        // so any holder found here is a different version.
        let Some(previous) = metadata.version_with(VersionStage::Current) else {
            warn!(secret_id, "no version holds the current stage");
            return Ok(());
        };

        self.store
            .move_stage(secret_id, VersionStage::Current, version, Some(previous))
            .await?;
        info!(secret_id, version, previous, "current stage moved");
        Ok(())
    }

    async fn require_staged(
        &self,
        secret_id: &str,
        version: Option<&str>,
        stage: VersionStage,
    ) -> Result<SecretValue> {
        match self.store.staged_value(secret_id, version, stage).await? {
            Staged::Found(value) => Ok(value),
            Staged::NotFound => Err(RotationError::SecretNotFound(format!(
                "{secret_id} has no {stage} value"
            ))),
        }
    }

    /// Locates the version holding the current stage and reads its value.
    async fn current_value(
        &self,
        secret_id: &str,
        metadata: &SecretMetadata,
    ) -> Result<SecretValue> {
        let holder = metadata
            .version_with(VersionStage::Current)
            .ok_or_else(|| {
                RotationError::SecretNotFound(format!("{secret_id} has no current version"))
            })?;
        self.require_staged(secret_id, Some(holder), VersionStage::Current)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_parses_wire_names() {
        assert_eq!(
            "createSecret".parse::<RotationStep>().unwrap(),
            RotationStep::Create
        );
        assert_eq!(
            "setSecret".parse::<RotationStep>().unwrap(),
            RotationStep::Set
        );
        assert_eq!(
            "testSecret".parse::<RotationStep>().unwrap(),
            RotationStep::Test
        );
        assert_eq!(
            "finishSecret".parse::<RotationStep>().unwrap(),
            RotationStep::Finish
        );
    }

    #[test]
    fn test_step_rejects_unknown_names() {
        let err = "rollbackSecret".parse::<RotationStep>().unwrap_err();
        assert!(matches!(err, RotationError::InvalidStep(step) if step == "rollbackSecret"));
    }

    #[test]
    fn test_step_round_trips() {
        for step in [
            RotationStep::Create,
            RotationStep::Set,
            RotationStep::Test,
            RotationStep::Finish,
        ] {
            assert_eq!(step.as_str().parse::<RotationStep>().unwrap(), step);
        }
    }

    #[test]
    fn test_request_deserializes_scheduler_event() {
        let raw = r#"{
            "SecretId": "prod/origin-secret",
            "ClientRequestToken": "v1",
            "Step": "createSecret"
        }"#;
        let request: RotationRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.secret_id, "prod/origin-secret");
        assert_eq!(request.version, "v1");
        assert_eq!(request.step, "createSecret");
    }
}

//! In-memory collaborators for exercising rotations without live control
//! planes.
//!
//! Each mock implements one capability trait with support for error
//! injection, and the externally-visible writes are recorded in a shared
//! [`CallLog`] so tests can assert the SET phase's ordering guarantee.

use crate::distribution::{rewrite_header, Distribution, Origin};
use crate::firewall::{EdgeFirewall, VerifyRule};
use crate::probe::OriginProbe;
use crate::secret::{SecretMetadata, SecretValue, Staged, VersionStage};
use crate::store::SecretStore;
use crate::wait::Propagation;
use crate::{Result, RotationConfig, RotationError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Shared journal recording the order of external calls.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// All entries recorded so far, in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

struct StoreState {
    rotation_enabled: bool,
    stages: HashMap<String, Vec<VersionStage>>,
    values: HashMap<String, SecretValue>,
    random_value: String,
}

/// In-memory secret store for a single secret.
///
/// # Example
///
/// ```
/// use originverify::mock::MockSecretStore;
/// use originverify::{SecretStore, VersionStage, Staged};
///
/// #[tokio::main]
/// async fn main() -> originverify::Result<()> {
///     let store = MockSecretStore::new("s1");
///     store.stage_current("v0", "old123").await;
///     store.begin_rotation("v1").await;
///
///     let staged = store
///         .staged_value("s1", Some("v1"), VersionStage::Pending)
///         .await?;
///     assert_eq!(staged, Staged::NotFound);
///     Ok(())
/// }
/// ```
pub struct MockSecretStore {
    secret_id: String,
    state: RwLock<StoreState>,
}

impl MockSecretStore {
    /// Creates an empty store for `secret_id` with rotation enabled.
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            state: RwLock::new(StoreState {
                rotation_enabled: true,
                stages: HashMap::new(),
                values: HashMap::new(),
                random_value: "mockrandomheadervalue".to_string(),
            }),
        }
    }

    /// Marks the secret as not enabled for rotation.
    pub async fn disable_rotation(&self) {
        self.state.write().await.rotation_enabled = false;
    }

    /// Registers `version` as the current version holding `header_value`.
    pub async fn stage_current(&self, version: impl Into<String>, header_value: impl Into<String>) {
        let version = version.into();
        let mut state = self.state.write().await;
        state
            .stages
            .insert(version.clone(), vec![VersionStage::Current]);
        state
            .values
            .insert(version, SecretValue::new(header_value));
    }

    /// Attaches the pending stage to `version` without a value, as the
    /// scheduler does when it starts a rotation.
    pub async fn begin_rotation(&self, version: impl Into<String>) {
        let mut state = self.state.write().await;
        state
            .stages
            .insert(version.into(), vec![VersionStage::Pending]);
    }

    /// Overrides the stages held by `version`.
    pub async fn set_stages(&self, version: impl Into<String>, stages: Vec<VersionStage>) {
        self.state.write().await.stages.insert(version.into(), stages);
    }

    /// Fixes the value the next `random_header_value` call produces.
    pub async fn set_random_value(&self, value: impl Into<String>) {
        self.state.write().await.random_value = value.into();
    }

    /// Stages currently held by `version`.
    pub async fn stages_of(&self, version: &str) -> Vec<VersionStage> {
        self.state
            .read()
            .await
            .stages
            .get(version)
            .cloned()
            .unwrap_or_default()
    }

    /// Value stored for `version`, if any.
    pub async fn value_of(&self, version: &str) -> Option<SecretValue> {
        self.state.read().await.values.get(version).cloned()
    }

    fn check_id(&self, secret_id: &str) -> Result<()> {
        if secret_id == self.secret_id {
            Ok(())
        } else {
            Err(RotationError::SecretNotFound(secret_id.to_string()))
        }
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    async fn describe(&self, secret_id: &str) -> Result<SecretMetadata> {
        self.check_id(secret_id)?;
        let state = self.state.read().await;
        Ok(SecretMetadata {
            rotation_enabled: state.rotation_enabled,
            stages: state.stages.clone(),
        })
    }

    async fn staged_value(
        &self,
        secret_id: &str,
        version: Option<&str>,
        stage: VersionStage,
    ) -> Result<Staged> {
        self.check_id(secret_id)?;
        let state = self.state.read().await;

        let holder = match version {
            Some(version) => Some(version),
            None => state
                .stages
                .iter()
                .find(|(_, stages)| stages.contains(&stage))
                .map(|(version, _)| version.as_str()),
        };

        let Some(holder) = holder else {
            return Ok(Staged::NotFound);
        };
        let staged = state
            .stages
            .get(holder)
            .is_some_and(|stages| stages.contains(&stage));
        match state.values.get(holder) {
            Some(value) if staged => Ok(Staged::Found(value.clone())),
            _ => Ok(Staged::NotFound),
        }
    }

    async fn put_value(
        &self,
        secret_id: &str,
        version: &str,
        value: &SecretValue,
        stage: VersionStage,
    ) -> Result<()> {
        self.check_id(secret_id)?;
        let mut state = self.state.write().await;
        state.values.insert(version.to_string(), value.clone());
        let stages = state.stages.entry(version.to_string()).or_default();
        if !stages.contains(&stage) {
            stages.push(stage);
        }
        Ok(())
    }

    async fn move_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        to_version: &str,
        from_version: Option<&str>,
    ) -> Result<()> {
        self.check_id(secret_id)?;
        let mut state = self.state.write().await;

        if let Some(from) = from_version {
            if let Some(stages) = state.stages.get_mut(from) {
                stages.retain(|s| *s != stage);
                if stage == VersionStage::Current && !stages.contains(&VersionStage::Previous) {
                    stages.push(VersionStage::Previous);
                }
            }
        }

        let stages = state.stages.entry(to_version.to_string()).or_default();
        if !stages.contains(&stage) {
            stages.push(stage);
        }
        Ok(())
    }

    async fn random_header_value(&self) -> Result<String> {
        Ok(self.state.read().await.random_value.clone())
    }
}

/// In-memory edge firewall recording every installed rule.
pub struct MockEdgeFirewall {
    rules: Mutex<Vec<VerifyRule>>,
    put_error: Mutex<Option<RotationError>>,
    log: CallLog,
}

impl MockEdgeFirewall {
    /// Creates a firewall mock reporting into `log`.
    pub fn new(log: CallLog) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            put_error: Mutex::new(None),
            log,
        }
    }

    /// Makes the next `put_rule` call fail with `err`.
    pub fn inject_put_error(&self, err: RotationError) {
        *self.put_error.lock().unwrap() = Some(err);
    }

    /// The most recently installed rule.
    pub fn last_rule(&self) -> Option<VerifyRule> {
        self.rules.lock().unwrap().last().cloned()
    }

    /// How many rules have been installed.
    pub fn install_count(&self) -> usize {
        self.rules.lock().unwrap().len()
    }
}

#[async_trait]
impl EdgeFirewall for MockEdgeFirewall {
    async fn put_rule(&self, rule: &VerifyRule) -> Result<()> {
        if let Some(err) = self.put_error.lock().unwrap().take() {
            return Err(err);
        }
        self.log.record("firewall.put_rule");
        self.rules.lock().unwrap().push(rule.clone());
        Ok(())
    }
}

/// In-memory distribution holding a set of origins.
pub struct MockDistribution {
    distribution_id: String,
    header_name: String,
    deployed: AtomicBool,
    origins: Mutex<Vec<Origin>>,
    writes: AtomicUsize,
    log: CallLog,
}

impl MockDistribution {
    /// Creates a deployed distribution with no origins, reporting into
    /// `log`.
    pub fn new(config: &RotationConfig, log: CallLog) -> Self {
        Self {
            distribution_id: config.distribution_id.clone(),
            header_name: config.header_name.clone(),
            deployed: AtomicBool::new(true),
            origins: Mutex::new(Vec::new()),
            writes: AtomicUsize::new(0),
            log,
        }
    }

    /// Sets the deployment status reported by `is_deployed`.
    pub fn set_deployed(&self, deployed: bool) {
        self.deployed.store(deployed, Ordering::SeqCst);
    }

    /// Adds an origin with the given custom headers.
    pub fn add_origin(&self, id: impl Into<String>, headers: &[(&str, &str)]) {
        self.origins.lock().unwrap().push(Origin {
            id: id.into(),
            custom_headers: headers
                .iter()
                .map(|(name, value)| crate::distribution::CustomHeader {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        });
    }

    /// Snapshot of the current origins.
    pub fn origins(&self) -> Vec<Origin> {
        self.origins.lock().unwrap().clone()
    }

    /// How many configuration writes have been issued.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Distribution for MockDistribution {
    async fn is_deployed(&self) -> Result<bool> {
        Ok(self.deployed.load(Ordering::SeqCst))
    }

    async fn set_header_value(&self, value: &str) -> Result<()> {
        if !self.deployed.load(Ordering::SeqCst) {
            return Err(RotationError::ResourceNotReady(format!(
                "distribution {} status is not deployed",
                self.distribution_id
            )));
        }

        // Rewrite a copy first so a zero match leaves the stored origins
        // untouched.
        let mut origins = self.origins.lock().unwrap().clone();
        let rewritten = rewrite_header(&mut origins, &self.header_name, value);
        if rewritten == 0 {
            return Err(RotationError::HeaderNotFound {
                distribution_id: self.distribution_id.clone(),
                header: self.header_name.clone(),
            });
        }

        self.log.record("distribution.set_header");
        *self.origins.lock().unwrap() = origins;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Probe accepting a configurable set of header values.
#[derive(Default)]
pub struct MockOriginProbe {
    accepted: Mutex<HashSet<String>>,
    probed: Mutex<Vec<String>>,
}

impl MockOriginProbe {
    /// Marks `value` as accepted by the origin.
    pub fn accept(&self, value: impl Into<String>) {
        self.accepted.lock().unwrap().insert(value.into());
    }

    /// Values probed so far, in order.
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl OriginProbe for MockOriginProbe {
    async fn accepts(&self, value: &str) -> Result<bool> {
        self.probed.lock().unwrap().push(value.to_string());
        Ok(self.accepted.lock().unwrap().contains(value))
    }
}

/// Zero-delay propagation wait that records when it was awaited.
pub struct RecordingDelay {
    log: CallLog,
}

impl RecordingDelay {
    /// Creates a recorder reporting into `log`.
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Propagation for RecordingDelay {
    async fn settle(&self) {
        self.log.record("propagation.settle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_staged_lookup() {
        let store = MockSecretStore::new("s1");
        store.stage_current("v0", "old123").await;

        let found = store
            .staged_value("s1", None, VersionStage::Current)
            .await
            .unwrap();
        assert_eq!(found, Staged::Found(SecretValue::new("old123")));

        let missing = store
            .staged_value("s1", Some("v1"), VersionStage::Pending)
            .await
            .unwrap();
        assert_eq!(missing, Staged::NotFound);
    }

    #[tokio::test]
    async fn test_store_rejects_unknown_secret() {
        let store = MockSecretStore::new("s1");
        let result = store.describe("other").await;
        assert!(matches!(result, Err(RotationError::SecretNotFound(_))));
    }

    #[tokio::test]
    async fn test_store_move_stage_demotes_prior_holder() {
        let store = MockSecretStore::new("s1");
        store.stage_current("v0", "old123").await;
        store.begin_rotation("v1").await;
        store
            .put_value("s1", "v1", &SecretValue::new("new456"), VersionStage::Pending)
            .await
            .unwrap();

        store
            .move_stage("s1", VersionStage::Current, "v1", Some("v0"))
            .await
            .unwrap();

        assert!(store.stages_of("v1").await.contains(&VersionStage::Current));
        let v0 = store.stages_of("v0").await;
        assert!(!v0.contains(&VersionStage::Current));
        assert!(v0.contains(&VersionStage::Previous));
    }

    #[tokio::test]
    async fn test_distribution_zero_matches_leaves_origins_untouched() {
        let config = RotationConfig::new("acl", "acl-id", "E2EXAMPLE");
        let distribution = MockDistribution::new(&config, CallLog::default());
        distribution.add_origin("api", &[("x-other", "v")]);

        let result = distribution.set_header_value("new456").await;

        assert!(matches!(result, Err(RotationError::HeaderNotFound { .. })));
        assert_eq!(distribution.write_count(), 0);
        assert_eq!(distribution.origins()[0].custom_headers[0].value, "v");
    }

    #[tokio::test]
    async fn test_firewall_error_injection_fires_once() {
        let firewall = MockEdgeFirewall::new(CallLog::default());
        firewall.inject_put_error(RotationError::external("waf", "throttled"));

        let config = RotationConfig::new("acl", "acl-id", "E2EXAMPLE");
        let rule = VerifyRule::for_rotation(&config, "a", "b");

        assert!(firewall.put_rule(&rule).await.is_err());
        assert!(firewall.put_rule(&rule).await.is_ok());
        assert_eq!(firewall.install_count(), 1);
    }
}

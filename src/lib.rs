//! Originverify - zero-downtime rotation of a shared origin-verification header.
//!
//! A content distribution attaches a secret custom header to every request it
//! forwards, and a firewall rule in front of the origin only admits requests
//! carrying that header. Originverify rotates the shared token through the
//! four-step protocol driven by the secret store's rotation scheduler, without
//! ever opening a window in which neither the old nor the new token is
//! accepted:
//!
//! 1. **create** - stage a fresh random value as the pending version
//! 2. **set** - teach the firewall both values, wait for the rule to
//!    propagate, then switch the distribution header to the new value
//! 3. **test** - probe the origin with both values through the live path
//! 4. **finish** - promote the pending version to current
//!
//! # Features
//!
//! - **Capability traits**: the secret store, firewall, distribution, probe
//!   and propagation delay are trait objects, so every collaborator can be
//!   swapped or mocked
//! - **Async/Await**: built on tokio for non-blocking I/O
//! - **Type Safety**: firewall rules and origin configurations are typed
//!   records, not untyped maps
//! - **Stateless Core**: all durable state lives in the secret store's
//!   version metadata; any step can be retried
//! - **Feature Flags**: AWS adapters compile only when asked for
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use originverify::mock::{
//!     CallLog, MockDistribution, MockEdgeFirewall, MockOriginProbe, MockSecretStore,
//!     RecordingDelay,
//! };
//! use originverify::{Rotation, RotationConfig, RotationStep};
//!
//! #[tokio::main]
//! async fn main() -> originverify::Result<()> {
//!     let config = RotationConfig::new("prod-acl", "a1b2c3", "E2EXAMPLE")
//!         .with_origin_url("https://origin.example.com/healthz");
//!
//!     let log = CallLog::default();
//!     let store = Arc::new(MockSecretStore::new("prod/origin-secret"));
//!     store.stage_current("v0", "old123").await;
//!     store.begin_rotation("v1").await;
//!
//!     let rotation = Rotation::new(
//!         config.clone(),
//!         store,
//!         Arc::new(MockEdgeFirewall::new(log.clone())),
//!         Arc::new(MockDistribution::new(&config, log.clone())),
//!         Arc::new(MockOriginProbe::default()),
//!         Arc::new(RecordingDelay::new(log)),
//!     );
//!
//!     rotation
//!         .execute_step("prod/origin-secret", "v1", RotationStep::Create)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Adapter | Feature Flag | Notes |
//! |---------|-------------|-------|
//! | Mock | `mock` (default) | In-memory collaborators with a call journal |
//! | AWS | `aws` | Secrets Manager, WAFv2 (regional), CloudFront |
//!
//! ```toml
//! [dependencies]
//! originverify = { version = "0.1", features = ["aws"] }
//! ```

pub mod config;
pub mod distribution;
pub mod error;
pub mod firewall;
pub mod probe;
pub mod rotation;
pub mod secret;
pub mod store;
pub mod wait;

#[cfg(feature = "aws")]
pub mod aws;
#[cfg(feature = "mock")]
pub mod mock;

pub use config::{RotationConfig, DEFAULT_SETTLE_DELAY};
pub use distribution::{CustomHeader, Distribution, Origin};
pub use error::{Result, RotationError};
pub use firewall::{EdgeFirewall, HeaderMatch, RuleAction, VerifyRule};
pub use probe::{HttpOriginProbe, OriginProbe};
pub use rotation::{Rotation, RotationRequest, RotationStep};
pub use secret::{SecretMetadata, SecretValue, Staged, VersionStage};
pub use store::SecretStore;
pub use wait::{FixedDelay, Propagation};

//! AWS-backed collaborators.
//!
//! Wires the capability traits to the services of the original deployment:
//! Secrets Manager for staged versions, WAFv2 (regional scope) for the
//! verification rule, CloudFront for the distribution header. Each adapter
//! owns its SDK client; credentials come from the default provider chain.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use originverify::aws::{AwsDistribution, AwsEdgeFirewall, AwsSecretStore};
//! use originverify::{FixedDelay, HttpOriginProbe, Rotation, RotationConfig};
//!
//! #[tokio::main]
//! async fn main() -> originverify::Result<()> {
//!     let config = RotationConfig::from_env()?;
//!
//!     let rotation = Rotation::new(
//!         config.clone(),
//!         Arc::new(AwsSecretStore::from_env().await),
//!         Arc::new(AwsEdgeFirewall::from_env(&config).await),
//!         Arc::new(AwsDistribution::from_env(&config).await),
//!         Arc::new(HttpOriginProbe::new(&config)),
//!         Arc::new(FixedDelay::new(config.settle_delay)),
//!     );
//!
//!     // Hand `rotation` to the scheduler entry point; each invocation
//!     // arrives as a `RotationRequest` and goes through `handle`.
//!     let _ = rotation;
//!     Ok(())
//! }
//! ```

mod cloudfront;
mod secrets;
mod waf;

pub use cloudfront::AwsDistribution;
pub use secrets::AwsSecretStore;
pub use waf::AwsEdgeFirewall;

//! Configuration for the rotation protocol.
//!
//! All settings are read once at process start into an explicit
//! [`RotationConfig`] and passed by reference into the state machine and the
//! updaters; phase logic never consults the process environment.

use crate::{Result, RotationError};
use std::time::Duration;

/// Default settle interval for regional firewall propagation.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(75);

/// Settings naming the managed resources.
///
/// ```
/// use originverify::RotationConfig;
///
/// let config = RotationConfig::new("prod-acl", "a1b2c3", "E2EXAMPLE")
///     .with_header_name("x-origin-verify")
///     .with_origin_url("https://origin.example.com/healthz")
///     .with_stack_name("prod");
/// assert_eq!(config.rule_name(), "prodXOriginVerify");
/// ```
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Firewall policy name.
    pub acl_name: String,

    /// Firewall policy id.
    pub acl_id: String,

    /// Priority slot reserved for the managed rule.
    pub rule_priority: i32,

    /// Content distribution id.
    pub distribution_id: String,

    /// Name of the managed custom request header.
    pub header_name: String,

    /// Endpoint probed during the TEST phase.
    pub origin_url: String,

    /// Naming prefix for the generated rule and metric names.
    pub stack_name: String,

    /// How long to wait for a firewall change to reach all regional
    /// enforcement points before touching the distribution.
    pub settle_delay: Duration,
}

impl RotationConfig {
    /// Creates a configuration for the given policy and distribution with
    /// defaults for everything else.
    pub fn new(
        acl_name: impl Into<String>,
        acl_id: impl Into<String>,
        distribution_id: impl Into<String>,
    ) -> Self {
        Self {
            acl_name: acl_name.into(),
            acl_id: acl_id.into(),
            rule_priority: 0,
            distribution_id: distribution_id.into(),
            header_name: "x-origin-verify".to_string(),
            origin_url: String::new(),
            stack_name: "originverify".to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Reads every setting from the process environment.
    ///
    /// Uses the variable names of the original deployment: `WAFACLNAME`,
    /// `WAFACLID`, `WAFRULEPRI`, `CFDISTROID`, `HEADERNAME`, `ORIGINURL`,
    /// `STACKNAME`. Intended to be called once at startup by the scheduler
    /// binary.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::Config`] for any missing variable or an
    /// unparsable rule priority.
    pub fn from_env() -> Result<Self> {
        fn var(name: &str) -> Result<String> {
            std::env::var(name).map_err(|_| RotationError::Config(format!("missing {name}")))
        }

        let priority: i32 = var("WAFRULEPRI")?
            .parse()
            .map_err(|_| RotationError::Config("WAFRULEPRI is not an integer".to_string()))?;

        Ok(Self {
            acl_name: var("WAFACLNAME")?,
            acl_id: var("WAFACLID")?,
            rule_priority: priority,
            distribution_id: var("CFDISTROID")?,
            header_name: var("HEADERNAME")?,
            origin_url: var("ORIGINURL")?,
            stack_name: var("STACKNAME")?,
            settle_delay: DEFAULT_SETTLE_DELAY,
        })
    }

    /// Sets the priority slot for the managed rule.
    pub fn with_rule_priority(mut self, priority: i32) -> Self {
        self.rule_priority = priority;
        self
    }

    /// Sets the managed header name.
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Sets the endpoint probed during TEST.
    pub fn with_origin_url(mut self, url: impl Into<String>) -> Self {
        self.origin_url = url.into();
        self
    }

    /// Sets the naming prefix for generated rule and metric names.
    pub fn with_stack_name(mut self, name: impl Into<String>) -> Self {
        self.stack_name = name.into();
        self
    }

    /// Sets the settle interval. Tests substitute a short interval here or
    /// inject a recording delay instead.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Name of the managed firewall rule.
    pub fn rule_name(&self) -> String {
        format!("{}XOriginVerify", self.stack_name)
    }

    /// Metric name attached to the managed rule.
    pub fn metric_name(&self) -> String {
        format!("{}XOriginVerify", self.stack_name)
    }
}

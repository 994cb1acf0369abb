//! Live verification probe against the origin endpoint.

use crate::{Result, RotationConfig};
use async_trait::async_trait;

/// Origin-probe capability consumed by the TEST phase.
#[async_trait]
pub trait OriginProbe: Send + Sync {
    /// Issues a single verification request carrying `value` and reports
    /// whether the origin accepted it.
    ///
    /// No retry happens inside the probe; retry policy belongs to the
    /// scheduler re-invoking the TEST step.
    async fn accepts(&self, value: &str) -> Result<bool>;
}

/// HTTP probe: one GET against the configured URL with the candidate value
/// in the managed header. HTTP 200 is the only success signal.
pub struct HttpOriginProbe {
    client: reqwest::Client,
    url: String,
    header_name: String,
}

impl HttpOriginProbe {
    /// Creates a probe for the configured origin URL and header name.
    pub fn new(config: &RotationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.origin_url.clone(),
            header_name: config.header_name.clone(),
        }
    }
}

#[async_trait]
impl OriginProbe for HttpOriginProbe {
    async fn accepts(&self, value: &str) -> Result<bool> {
        let response = self
            .client
            .get(&self.url)
            .header(self.header_name.as_str(), value)
            .send()
            .await?;

        let status = response.status();
        tracing::info!(url = %self.url, status = %status, "origin probe");

        Ok(status == reqwest::StatusCode::OK)
    }
}

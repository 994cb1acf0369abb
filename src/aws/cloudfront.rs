//! CloudFront implementation of the distribution capability.

use crate::distribution::Distribution;
use crate::{Result, RotationConfig, RotationError};
use async_trait::async_trait;
use aws_sdk_cloudfront::Client;

/// Content distribution backed by CloudFront.
pub struct AwsDistribution {
    client: Client,
    distribution_id: String,
    header_name: String,
}

impl AwsDistribution {
    /// Wraps an existing client.
    pub fn new(client: Client, config: &RotationConfig) -> Self {
        Self {
            client,
            distribution_id: config.distribution_id.clone(),
            header_name: config.header_name.clone(),
        }
    }

    /// Builds a distribution adapter from the default credential chain.
    pub async fn from_env(config: &RotationConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(Client::new(&sdk_config), config)
    }
}

#[async_trait]
impl Distribution for AwsDistribution {
    async fn is_deployed(&self) -> Result<bool> {
        let response = self
            .client
            .get_distribution()
            .id(&self.distribution_id)
            .send()
            .await
            .map_err(|e| {
                RotationError::external("cloudfront", format!("get_distribution: {e}"))
            })?;

        let distribution = response.distribution.ok_or_else(|| {
            RotationError::external(
                "cloudfront",
                format!("distribution {} not found", self.distribution_id),
            )
        })?;

        Ok(distribution.status == "Deployed")
    }

    async fn set_header_value(&self, value: &str) -> Result<()> {
        // The status can change between the SET-phase precondition and this
        // write, so it is checked again here.
        if !self.is_deployed().await? {
            return Err(RotationError::ResourceNotReady(format!(
                "distribution {} status is not deployed",
                self.distribution_id
            )));
        }

        let response = self
            .client
            .get_distribution_config()
            .id(&self.distribution_id)
            .send()
            .await
            .map_err(|e| {
                RotationError::external("cloudfront", format!("get_distribution_config: {e}"))
            })?;

        let etag = response.etag.clone().ok_or_else(|| {
            RotationError::external(
                "cloudfront",
                format!("distribution {} returned no etag", self.distribution_id),
            )
        })?;
        let mut config = response.distribution_config.ok_or_else(|| {
            RotationError::external(
                "cloudfront",
                format!("distribution {} has no configuration", self.distribution_id),
            )
        })?;

        let mut rewritten = 0;
        for origin in config.origins.items.iter_mut() {
            let headers = origin
                .custom_headers
                .as_mut()
                .filter(|headers| headers.quantity > 0)
                .and_then(|headers| headers.items.as_mut());
            let Some(headers) = headers else {
                tracing::info!(origin = %origin.id, "no custom headers found in origin");
                continue;
            };
            for header in headers.iter_mut() {
                if header.header_name == self.header_name {
                    tracing::info!(origin = %origin.id, header = %header.header_name, "updating custom header");
                    header.header_value = value.to_string();
                    rewritten += 1;
                } else {
                    tracing::info!(origin = %origin.id, header = %header.header_name, "ignoring custom header");
                }
            }
        }

        if rewritten == 0 {
            return Err(RotationError::HeaderNotFound {
                distribution_id: self.distribution_id.clone(),
                header: self.header_name.clone(),
            });
        }

        tracing::info!(
            distribution_id = %self.distribution_id,
            origins = rewritten,
            "updating distribution configuration"
        );
        self.client
            .update_distribution()
            .id(&self.distribution_id)
            .if_match(etag)
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| {
                let text = e.to_string();
                if text.contains("PreconditionFailed") || text.contains("InvalidIfMatchVersion") {
                    RotationError::ConcurrentModification(format!(
                        "distribution {}: {text}",
                        self.distribution_id
                    ))
                } else {
                    RotationError::external("cloudfront", format!("update_distribution: {text}"))
                }
            })?;

        Ok(())
    }
}

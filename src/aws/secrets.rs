//! Secrets Manager implementation of the secret store.

use crate::secret::{SecretMetadata, SecretValue, Staged, VersionStage};
use crate::store::SecretStore;
use crate::{Result, RotationError};
use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use std::collections::HashMap;

/// Secret store backed by AWS Secrets Manager.
pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a store from the default credential chain.
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn describe(&self, secret_id: &str) -> Result<SecretMetadata> {
        let response = self
            .client
            .describe_secret()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("ResourceNotFoundException") {
                    RotationError::SecretNotFound(secret_id.to_string())
                } else {
                    RotationError::Other(anyhow::anyhow!("describe_secret: {e}"))
                }
            })?;

        let mut stages = HashMap::new();
        for (version, labels) in response.version_ids_to_stages.unwrap_or_default() {
            // Unknown labels are skipped rather than rejected.
            let parsed = labels
                .iter()
                .filter_map(|label| VersionStage::parse(label))
                .collect();
            stages.insert(version, parsed);
        }

        Ok(SecretMetadata {
            rotation_enabled: response.rotation_enabled.unwrap_or(false),
            stages,
        })
    }

    async fn staged_value(
        &self,
        secret_id: &str,
        version: Option<&str>,
        stage: VersionStage,
    ) -> Result<Staged> {
        let mut request = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .version_stage(stage.as_str());
        if let Some(version) = version {
            request = request.version_id(version);
        }

        match request.send().await {
            Ok(response) => {
                let raw = response.secret_string.ok_or_else(|| {
                    RotationError::SecretNotFound(format!("{secret_id} has no string value"))
                })?;
                Ok(Staged::Found(SecretValue::from_json(&raw)?))
            }
            Err(e) if e.to_string().contains("ResourceNotFoundException") => Ok(Staged::NotFound),
            Err(e) => Err(RotationError::Other(anyhow::anyhow!(
                "get_secret_value: {e}"
            ))),
        }
    }

    async fn put_value(
        &self,
        secret_id: &str,
        version: &str,
        value: &SecretValue,
        stage: VersionStage,
    ) -> Result<()> {
        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .client_request_token(version)
            .secret_string(value.to_json()?)
            .version_stages(stage.as_str())
            .send()
            .await
            .map_err(|e| RotationError::Other(anyhow::anyhow!("put_secret_value: {e}")))?;

        tracing::info!(secret_id, version, stage = %stage, "staged secret value");
        Ok(())
    }

    async fn move_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        to_version: &str,
        from_version: Option<&str>,
    ) -> Result<()> {
        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(stage.as_str())
            .move_to_version_id(to_version)
            .set_remove_from_version_id(from_version.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                RotationError::Other(anyhow::anyhow!("update_secret_version_stage: {e}"))
            })?;

        tracing::info!(secret_id, to_version, stage = %stage, "moved version stage");
        Ok(())
    }

    async fn random_header_value(&self) -> Result<String> {
        let response = self
            .client
            .get_random_password()
            .exclude_punctuation(true)
            .send()
            .await
            .map_err(|e| RotationError::Other(anyhow::anyhow!("get_random_password: {e}")))?;

        response.random_password.ok_or_else(|| {
            RotationError::Other(anyhow::anyhow!("secret store returned no random value"))
        })
    }
}

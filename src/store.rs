//! Secret-store capability consumed by the state machine.

use crate::secret::{SecretMetadata, SecretValue, Staged, VersionStage};
use crate::Result;
use async_trait::async_trait;

/// Staged-version read/write primitives of the secret store.
///
/// All durable rotation state lives behind this trait: the version-to-stage
/// map is the state machine's only memory between scheduler invocations.
///
/// Implementations must be `Send + Sync` to support concurrent access across
/// async tasks.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the rotation flag and version-stage map for a secret.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::SecretNotFound`](crate::RotationError::SecretNotFound)
    /// if no secret exists under `secret_id`.
    async fn describe(&self, secret_id: &str) -> Result<SecretMetadata>;

    /// Reads the value held at `stage`, optionally pinned to a specific
    /// version token.
    ///
    /// A missing version/stage combination is reported as
    /// [`Staged::NotFound`] rather than an error; CREATE branches on the
    /// variant to decide create-vs-fetch.
    async fn staged_value(
        &self,
        secret_id: &str,
        version: Option<&str>,
        stage: VersionStage,
    ) -> Result<Staged>;

    /// Stages `value` under `version` with the given stage label.
    async fn put_value(
        &self,
        secret_id: &str,
        version: &str,
        value: &SecretValue,
        stage: VersionStage,
    ) -> Result<()>;

    /// Moves `stage` to `to_version`, removing it from `from_version` when
    /// one is given. This is the store's atomic stage-reassignment
    /// primitive; FINISH is its only caller.
    async fn move_stage(
        &self,
        secret_id: &str,
        stage: VersionStage,
        to_version: &str,
        from_version: Option<&str>,
    ) -> Result<()>;

    /// Produces a fresh random header value, free of punctuation so it can
    /// travel in an HTTP header without quoting.
    async fn random_header_value(&self) -> Result<String>;
}

//! Secret payload and version-stage types.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stage label attached to a secret version.
///
/// At most one version holds [`Pending`](VersionStage::Pending) and at most
/// one holds [`Current`](VersionStage::Current) at any time. Superseded
/// versions are demoted to [`Previous`](VersionStage::Previous).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionStage {
    /// Value being staged by an in-flight rotation.
    Pending,
    /// Value currently enforced by both external systems.
    Current,
    /// Historical value no longer enforced.
    Previous,
}

impl VersionStage {
    /// Wire label used by the secret store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "AWSPENDING",
            Self::Current => "AWSCURRENT",
            Self::Previous => "AWSPREVIOUS",
        }
    }

    /// Parses a store label. Unknown labels yield `None` and are skipped
    /// when reading version metadata.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "AWSPENDING" => Some(Self::Pending),
            "AWSCURRENT" => Some(Self::Current),
            "AWSPREVIOUS" => Some(Self::Previous),
            _ => None,
        }
    }
}

impl std::fmt::Display for VersionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotation flags and version-stage assignments for a secret.
#[derive(Debug, Clone, Default)]
pub struct SecretMetadata {
    /// Whether the secret is enabled for rotation.
    pub rotation_enabled: bool,
    /// Map from version token to the stages that version holds.
    pub stages: HashMap<String, Vec<VersionStage>>,
}

impl SecretMetadata {
    /// Stages held by `version`, or `None` if the version is unknown.
    pub fn stages_for(&self, version: &str) -> Option<&[VersionStage]> {
        self.stages.get(version).map(Vec::as_slice)
    }

    /// Whether `version` holds `stage`.
    pub fn has_stage(&self, version: &str, stage: VersionStage) -> bool {
        self.stages_for(version)
            .is_some_and(|stages| stages.contains(&stage))
    }

    /// The version holding `stage`, found by scanning the stage map.
    pub fn version_with(&self, stage: VersionStage) -> Option<&str> {
        self.stages
            .iter()
            .find(|(_, stages)| stages.contains(&stage))
            .map(|(version, _)| version.as_str())
    }
}

/// Payload stored for each secret version.
///
/// The wire format is a one-field JSON object so the enforcement points and
/// the origin's own validation can all parse the same document:
///
/// ```text
/// {"HEADERVALUE": "a1b2c3..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretValue {
    /// The opaque verification header value.
    #[serde(rename = "HEADERVALUE")]
    pub header_value: String,
}

impl SecretValue {
    /// Wraps a header value in the payload shape.
    pub fn new(header_value: impl Into<String>) -> Self {
        Self {
            header_value: header_value.into(),
        }
    }

    /// Parses the stored JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serializes to the stored JSON document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Result of looking up a staged secret value.
///
/// A missing version/stage combination is an expected state during CREATE,
/// not a failure, so the store reports it as a variant rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    /// The stage holds a value.
    Found(SecretValue),
    /// No value is staged under this version/stage combination.
    NotFound,
}

impl Staged {
    /// Converts to `Option`, discarding the distinction from store errors.
    pub fn found(self) -> Option<SecretValue> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }
}

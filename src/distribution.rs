//! Distribution origin model and the distribution capability.

use crate::Result;
use async_trait::async_trait;

/// One custom request header attached to an origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHeader {
    /// Header name.
    pub name: String,
    /// Header value sent with every origin request.
    pub value: String,
}

/// An upstream server fronted by the distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Origin id.
    pub id: String,
    /// Custom headers attached to requests for this origin.
    pub custom_headers: Vec<CustomHeader>,
}

/// Sets `value` on every origin header whose name equals `header_name`
/// exactly (case-sensitive), returning how many headers were rewritten.
///
/// A zero count means the distribution carries nothing to rotate; callers
/// must not write the configuration back in that case.
pub fn rewrite_header(origins: &mut [Origin], header_name: &str, value: &str) -> usize {
    let mut rewritten = 0;
    for origin in origins.iter_mut() {
        if origin.custom_headers.is_empty() {
            tracing::info!(origin = %origin.id, "no custom headers found in origin");
            continue;
        }
        for header in &mut origin.custom_headers {
            if header.name == header_name {
                tracing::info!(origin = %origin.id, header = %header.name, "updating custom header");
                header.value = value.to_string();
                rewritten += 1;
            } else {
                tracing::info!(origin = %origin.id, header = %header.name, "ignoring custom header");
            }
        }
    }
    rewritten
}

/// Distribution capability consumed by the SET phase.
#[async_trait]
pub trait Distribution: Send + Sync {
    /// Whether the distribution has finished deploying its last change.
    /// Updating a distribution mid-deployment is unsafe, so SET refuses to
    /// proceed until this reports `true`.
    async fn is_deployed(&self) -> Result<bool>;

    /// Rewrites the managed header to `value` on every origin that carries
    /// it, writing the full configuration back under the read's
    /// concurrency token.
    ///
    /// # Errors
    ///
    /// - [`RotationError::HeaderNotFound`](crate::RotationError::HeaderNotFound):
    ///   no origin carries the managed header; nothing was written
    /// - [`RotationError::ResourceNotReady`](crate::RotationError::ResourceNotReady):
    ///   the distribution stopped being fully deployed
    /// - [`RotationError::ExternalUpdateFailed`](crate::RotationError::ExternalUpdateFailed):
    ///   the control plane rejected the write
    async fn set_header_value(&self, value: &str) -> Result<()>;
}

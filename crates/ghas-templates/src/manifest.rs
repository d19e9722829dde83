use ghas_core::ComplianceManifest;

use crate::TemplateError;

/// Placeholder manifest committed alongside a new workflow for the owner to complete.
pub fn placeholder_manifest() -> Result<String, TemplateError> {
    Ok(serde_json::to_string(&ComplianceManifest::placeholder())?)
}

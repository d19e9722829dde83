pub mod manifest;
pub mod pull_request;
pub mod workflow;

pub use manifest::*;
pub use pull_request::*;
pub use workflow::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to render workflow: {0}")]
    Workflow(#[from] serde_yaml::Error),
    #[error("failed to render manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("cannot render a workflow with no languages")]
    NoLanguages,
}

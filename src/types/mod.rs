//! Domain newtypes with validation at construction.

use thiserror::Error;

mod domain_types;
mod ids;

pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid page ID '{input}': {reason}")]
    InvalidPageId { input: String, reason: String },

    #[error("Invalid space key '{0}'")]
    InvalidSpaceKey(String),

    #[error("Invalid issue key '{0}': expected PROJECT-123")]
    InvalidIssueKey(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Invalid API token format: {reason}")]
    InvalidApiToken { reason: String },

    #[error("Batch size {size} out of bounds, expected 1..={max}")]
    InvalidBatchSize { size: usize, max: usize },

    #[error("Depth policy '{policy}' requires an anchor page ID")]
    MissingAnchor { policy: String },
}

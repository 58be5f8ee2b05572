use std::path::PathBuf;

use thiserror::Error;

use crate::{identity::DeclarationId, pipeline::RunState};

/// Fatal errors that abort a documentation run.
///
/// Recoverable problems (unresolved links, failed index fetches, cyclic supertypes) never
/// surface here; they are collected as [`crate::Diagnostic`]s instead.
#[derive(Error, Debug)]
pub enum ApiweaveError {
    /// The registry or run configuration cannot support the requested run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The upstream semantic model violated identity or kind invariants.
    #[error("model inconsistency at {id}: {reason}")]
    ModelInconsistency {
        /// Declaration at which the inconsistency was detected.
        id: DeclarationId,
        /// Description of the violated invariant.
        reason: String,
    },

    /// A pipeline stage was invoked out of order.
    #[error("pipeline stage '{stage}' requires state {expected:?}, but the run is in {found:?}")]
    StageOrder {
        /// The stage that was attempted.
        stage: &'static str,
        /// State required to run the stage.
        expected: RunState,
        /// State the run was actually in.
        found: RunState,
    },

    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a file at a specific path.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse or produce JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fetching an external link index failed.
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// URL that was requested.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// A renderer could not produce output for a page.
    #[error("render error on page '{page}': {reason}")]
    Render {
        /// Name of the page being rendered.
        page: String,
        /// Description of the failure.
        reason: String,
    },
}

impl ApiweaveError {
    /// Shorthand for constructing a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Shorthand for constructing a model inconsistency error.
    pub fn inconsistent(id: &DeclarationId, reason: impl Into<String>) -> Self {
        Self::ModelInconsistency {
            id: id.clone(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiweaveError>;

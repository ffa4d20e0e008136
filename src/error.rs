use thiserror::Error;

use crate::session::SessionId;

/// Conditions the engine reports to its callers.
///
/// Malformed numeric cells and zero denominators never show up here: they
/// are coerced to zero where they occur.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Nothing has been ingested for the session yet.
    #[error("no inventory loaded for session '{session}'")]
    NoData { session: SessionId },
    /// The requested view needs a column the ingested table does not have.
    #[error("column '{column}' is not present in the loaded inventory")]
    FeatureUnavailable { column: String },
    #[error("session state lock poisoned")]
    StatePoisoned,
}

impl EngineError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, EngineError::NoData { .. })
    }

    pub fn is_feature_unavailable(&self) -> bool {
        matches!(self, EngineError::FeatureUnavailable { .. })
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

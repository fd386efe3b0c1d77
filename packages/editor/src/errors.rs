//! Error types for the editor

use folio_model::{ListError, ModelError};
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Edit error: {0}")]
    Edit(#[from] crate::edits::EditError),

    #[error("Editing session already completed")]
    SessionCompleted,

    #[error("Cannot schedule a callback after the session completed")]
    ScheduleAfterComplete,

    #[error("Invalid config: {0}")]
    Config(String),
}

impl From<ListError> for EditorError {
    fn from(e: ListError) -> Self {
        EditorError::Model(e.into())
    }
}

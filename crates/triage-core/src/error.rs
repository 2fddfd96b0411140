use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("not initialized: run 'triage init'")]
    NotInitialized,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("required tool not available: {0}")]
    ToolUnavailable(String),

    #[error("source '{source_name}' unavailable: {reason}")]
    SourceFetch { source_name: String, reason: String },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("search error: {0}")]
    Search(String),

    #[error("review failed: {0}")]
    Review(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TriageError {
    pub fn source_fetch(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        TriageError::SourceFetch {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;

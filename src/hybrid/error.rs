//! Secondary sink error types

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Secondary sink I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize message for secondary sink: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.into(),
            source,
        }
    }
}

impl crate::core::error_handling::ContextualError for SinkError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, SinkError::Io { .. })
    }

    fn user_message(&self) -> Option<String> {
        match self {
            SinkError::Io { path, source } => Some(format!(
                "Cannot write secondary sink file {}: {}",
                path.display(),
                source
            )),
            SinkError::Serialize(_) => None,
        }
    }
}

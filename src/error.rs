use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by [`crate::store::PromptStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage directory or file is inaccessible for a reason other than absence.
    #[error("Failed to initialize storage at {}: {source}", path.display())]
    StorageInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed storage file {}: {reason}", path.display())]
    MalformedStorage { path: PathBuf, reason: String },

    #[error("A prompt with id '{0}' already exists")]
    DuplicateId(String),

    #[error("No prompt with id '{0}'")]
    NotFound(String),

    #[error("Invalid prompt: {0}")]
    InvalidRecord(String),

    /// The in-memory change was applied but the file write failed.
    #[error("Failed to save prompts to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_path() {
        let err = StoreError::MalformedStorage {
            path: PathBuf::from("/tmp/prompts.json"),
            reason: "expected value at line 1 column 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed storage file /tmp/prompts.json: expected value at line 1 column 1"
        );
    }

    #[test]
    fn test_persistence_error_keeps_source() {
        use std::error::Error;
        let err = StoreError::Persistence {
            path: PathBuf::from("/x/prompts.json"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "Failed to save prompts to /x/prompts.json: disk full");
        assert!(err.source().is_some());
    }
}

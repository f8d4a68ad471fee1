//! Error types for document access, merging, and the secrets store.

use std::path::PathBuf;

use thiserror::Error;

use crate::value::Kind;

/// Errors that can occur while parsing, merging, or persisting settings documents.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The original document's root is a scalar, so there is nothing to merge into.
    #[error("the original document to merge into must be a container, found {0}")]
    RootType(Kind),

    /// A typed accessor was used on a value of a different kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: Kind, found: Kind },

    /// The input text was not valid JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A filesystem operation in the secrets store failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither `APPDATA` nor `HOME` is available to locate the secrets root.
    #[error("could not determine a location for storing user secrets")]
    SecretsRoot,

    /// The secrets id cannot be used as a directory name.
    #[error("invalid secrets id: {0:?}")]
    InvalidId(String),
}

impl SettingsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SettingsError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout settings-merge.
pub type Result<T> = std::result::Result<T, SettingsError>;

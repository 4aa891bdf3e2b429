use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a build run.
///
/// Degraded license data (unparseable expressions, unknown identifiers) is
/// never an error: it is logged through `tracing` and resolution continues.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration, detected while constructing the engine.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A package manifest exists but is not valid JSON.
    #[error("failed to parse package manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A read, copy, directory creation or write failed.
    #[error("{action} {path}: {source}")]
    FileSystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest payload could not be serialized.
    #[error("failed to serialize license manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileSystem {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Typed errors of the conversion pipeline

use std::path::PathBuf;

/// Conversion failure that aborts one artifact
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The document dump is not a valid source model
    #[error("invalid source document: {0}")]
    Document(#[from] serde_json::Error),

    /// An instance passed validation but its controller stack has no base geometry
    #[error("instance '{url}' of node '{node}' does not resolve to a geometry")]
    Resolution { node: String, url: String },

    /// An artifact could not be written
    #[error("failed to write {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn artifact(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Artifact {
            path: path.into(),
            source,
        }
    }
}

//! Error types for the watermark removal workflow.

use std::path::PathBuf;

/// Errors raised while preparing or running a batch.
///
/// Configuration errors and an unreadable input or output directory stop a run
/// before any job starts; everything else is scoped to the job that raised it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing credential or an invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading, writing or deleting a file or directory failed.
    #[error("filesystem error on {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The edit service could not be reached or returned an unusable answer.
    #[error("edit service error: {0}")]
    EditService(String),

    /// HTTP transport failure talking to the edit service.
    #[error("edit service request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The returned image could not be decoded or re-encoded as JPEG.
    #[error("failed to encode JPEG: {0}")]
    Encode(#[from] image::ImageError),

    /// The metadata tool failed to copy tags.
    #[error("metadata copy failed: {0}")]
    MetadataCopy(String),

    /// Operator input could not be read.
    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

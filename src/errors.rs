//! Error types for volume operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for volume operations
pub type Result<T> = std::result::Result<T, VolmexError>;

/// Errors that can occur while handling volume requests
///
/// The `Display` text is what plugin clients receive in the `Err` field, so
/// the lookup-miss literals must stay stable.
#[derive(Error, Debug)]
pub enum VolmexError {
    #[error("no mount command given (option \"cmd\" is required)")]
    MissingCommand,

    #[error("invalid volume name: {0:?}")]
    InvalidName(String),

    /// Registry lookup miss, as reported by `Get`
    #[error("volume not found")]
    NotFound,

    /// Lookup miss as reported by `Path` and `Mount`
    #[error("no such volume")]
    UnknownVolume,

    #[error("could not read state from {}: {source}", path.display())]
    StateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse state from {}: {source}", path.display())]
    StateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write state to {}: {source}", path.display())]
    StateWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not create storage directory {}: {source}", path.display())]
    StorageDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("mount command failed ({reason}): {output}")]
    CommandFailed { reason: String, output: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl VolmexError {
    /// Whether this error comes from reading or writing the state file
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            VolmexError::StateRead { .. }
                | VolmexError::StateParse { .. }
                | VolmexError::StateWrite { .. }
        )
    }
}

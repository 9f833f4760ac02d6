//! Error kinds surfaced by the pipeline.
//!
//! Every variant here is fatal: the pipeline stops at the first one and no
//! output is produced. Skipped placemarks and coordinate tokens are not errors;
//! they are logged and counted by the stage that dropped them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed KML/XML input.
    #[error("failed to parse KML at byte {position}: {message}")]
    Parse { position: u64, message: String },

    /// Unreadable or unrecognized vector dataset.
    #[error("failed to load vector layer {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// A boolean operation failed or left an invalid result after repair.
    #[error("geometry operation failed: {0}")]
    Geometry(String),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

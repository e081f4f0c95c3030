//! Error types for the stitching pipeline.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Every failure the library can report.
///
/// Location errors are raised before any work starts. Decode, encode and I/O
/// errors raised while handling one group are caught by the archive and
/// folder runners and recorded as a group failure instead of aborting the run.
#[derive(Error, Debug)]
pub enum StitchError {
    /// A source's bytes are not a decodable image.
    #[error("failed to decode image {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// A composite could not be encoded.
    #[error("failed to encode composite for {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// A file could not be read, written or deleted.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("input location not found: {0}")]
    InvalidLocation(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The settings file exists but is not valid settings JSON.
    #[error("settings error in {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

pub type StitchResult<T> = Result<T, StitchError>;

impl StitchError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn decode(name: impl Into<String>, source: image::ImageError) -> Self {
        Self::Decode {
            name: name.into(),
            source,
        }
    }

    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// True for errors that reject the input before any processing.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidLocation(_) | Self::NotADirectory(_) | Self::InvalidOptions(_)
        )
    }
}

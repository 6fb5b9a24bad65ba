use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported format '{0}' (expected one of: csv, tsv)")]
    UnsupportedFormat(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: malformed record '{content}': {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        content: String,
        reason: String,
    },

    #[error("{}:{line}: invalid numeric value '{value}'", path.display())]
    InvalidValue {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("clustering failed: {0}")]
    ClusteringFailure(String),

    #[error("identifier '{0}' not found in manifest")]
    UnknownKey(String),

    #[error("unsupported output '{}' (expected .svg, .png, .html or .json)", .0.display())]
    UnsupportedOutput(PathBuf),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to serialize figure: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

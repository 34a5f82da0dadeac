use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TuneDeckError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("SQLite error: {0}")]
    Sqlite(Box<sqlx::Error>),

    #[error("Directory '{0}' does not exist")]
    MissingDirectory(PathBuf),

    #[error("Audio encoder '{0}' is not installed or not in PATH")]
    EncoderUnavailable(String),

    #[error("TuneDeckError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for TuneDeckError {
    fn from(error: std::io::Error) -> Self {
        TuneDeckError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for TuneDeckError {
    fn from(error: reqwest::Error) -> Self {
        TuneDeckError::Reqwest(Box::new(error))
    }
}

impl From<sqlx::Error> for TuneDeckError {
    fn from(error: sqlx::Error) -> Self {
        TuneDeckError::Sqlite(Box::new(error))
    }
}

/// Why a single tune lookup did not produce a complete record.
///
/// Lookups never fail a batch; the organizer branches on [`LookupErrorKind`]
/// and routes the item to the unknown bucket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no search results for '{0}'")]
    NotFound(String),

    #[error("incomplete metadata at {url} (T:{title:?}, R:{rhythm:?}, K:{key:?})")]
    ParseIncomplete {
        url: String,
        title: Option<String>,
        rhythm: Option<String>,
        key: Option<String>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupErrorKind {
    NotFound,
    ParseIncomplete,
    NetworkError,
    IoError,
}

impl LookupError {
    pub fn kind(&self) -> LookupErrorKind {
        match self {
            LookupError::NotFound(_) => LookupErrorKind::NotFound,
            LookupError::ParseIncomplete { .. } => LookupErrorKind::ParseIncomplete,
            LookupError::Network(_) => LookupErrorKind::NetworkError,
            LookupError::Io(_) => LookupErrorKind::IoError,
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(error: reqwest::Error) -> Self {
        LookupError::Network(error.to_string())
    }
}

impl From<std::io::Error> for LookupError {
    fn from(error: std::io::Error) -> Self {
        LookupError::Io(error.to_string())
    }
}

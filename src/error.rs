//! Error types that cross the library boundary.
//!
//! Every failure that can come from outside data (persisted copy, shared link,
//! remote document) is converted into one of these before it reaches a caller,
//! so the front end only ever has to show a notice and carry on.

use std::fmt;

use thiserror::Error;

/// Where a batch of occupancy data was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    SharedLink,
    LocalStorage,
    Remote,
    Seed,
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataOrigin::SharedLink => "shared link",
            DataOrigin::LocalStorage => "local storage",
            DataOrigin::Remote => "remote source",
            DataOrigin::Seed => "built-in seed",
        };
        f.write_str(name)
    }
}

impl DataOrigin {
    /// Whether the data came from this machine's own copy (or its empty default).
    pub fn is_local(&self) -> bool {
        matches!(self, DataOrigin::LocalStorage | DataOrigin::Seed)
    }
}

/// Initial data could not be turned into a store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to load occupancy data from {origin}: {reason}")]
    LoadFailed { origin: DataOrigin, reason: String },

    #[error("failed to fetch public occupancy data: {0}")]
    RemoteFetchFailed(String),
}

/// A share token is not readable under the current or the legacy scheme.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("share token is empty")]
    Empty,

    #[error("share token is not valid under the current or legacy encoding")]
    Unrecognized,

    #[error("share token payload has an unexpected shape: {0}")]
    InvalidShape(String),
}

/// Reading or writing the persisted copy failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A string is not a canonical `YYYY-MM-DD` day.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid date {0:?}: expected YYYY-MM-DD")]
pub struct InvalidDateKey(pub String);

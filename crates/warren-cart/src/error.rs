//! # Cart Store Errors
//!
//! Failures of the local key-value store. [`CartSession`](crate::CartSession)
//! logs and swallows every one of these; they only surface to callers that
//! use a [`CartStore`](crate::CartStore) directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartStoreError {
    /// Reading or writing the backing file failed.
    #[error("Cart storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored bytes are not a cart bucket.
    #[error("Cart data for {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Stored bucket was written by an incompatible version.
    #[error("Cart data for {key} has unsupported version {found}")]
    UnsupportedVersion { key: String, found: u32 },

    /// Key contains characters that cannot be mapped to a file name.
    #[error("Invalid cart storage key: {0}")]
    InvalidKey(String),

    /// The platform reports no per-user data directory.
    #[error("No data directory available for the cart store")]
    NoDataDir,
}

pub type CartStoreResult<T> = Result<T, CartStoreError>;

impl CartStoreError {
    pub(crate) fn io(key: &str, source: std::io::Error) -> Self {
        CartStoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

//! Library error type.
//!
//! The render and update paths degrade instead of failing, so only a few
//! operations can actually produce one of these.

use std::io;

/// Errors surfaced by the `mdsource` library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The background file watcher thread could not be started.
    #[error("failed to spawn file watcher thread: {0}")]
    WatcherSpawn(#[source] io::Error),

    /// A URL handed to a surface was not a base64 `data:` URI.
    #[error("not a base64 data URI: {0}")]
    InvalidDataUri(String),

    /// The payload of a `data:` URI was not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Filesystem failure while writing surface output.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for imap-relay
//!
//! One variant per failure class in the transfer pipeline. Expected
//! protocol-status failures (a NO/BAD on SEARCH, STORE, ...) and
//! transport faults (dropped connections, TLS) are distinct variants
//! so they can be logged distinctly, even though every one of them
//! aborts the current run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Opening the source transport failed (network or timeout).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The source server rejected the credentials.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The requested folder does not exist or cannot be selected.
    #[error("Folder error: {0}")]
    Folder(String),

    /// The server reported a non-success status for a SEARCH.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A message body could not be retrieved.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The destination refused or failed to store a message.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// The acknowledgment flag mutation was rejected.
    #[error("Flag error: {0}")]
    Flag(String),

    /// TLS upgrade or handshake failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

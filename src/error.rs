//! Error types for reqbridge.

use thiserror::Error;

/// Errors raised while decoding the wire protocol.
///
/// Any of these terminates the originating connection; the decoder becomes
/// terminal and refuses further input with [`ProtocolError::Halted`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Command code was not a number or exceeded the table.
    #[error("invalid command {0:?}")]
    InvalidCommand(String),

    /// Declared length of a string-like parameter was not a number.
    #[error("invalid string count {0:?}")]
    InvalidLength(String),

    /// A length-counted value was not followed by the `|` terminator.
    #[error("expecting BAR after string: {0:?}")]
    ExpectedTerminator(String),

    /// Parameter bytes were not valid UTF-8.
    #[error("invalid string (not UTF-8)")]
    InvalidString,

    /// Integer parameter did not parse as a signed decimal.
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),

    /// Bool parameter was something other than "0" or "1".
    #[error("invalid bool {0:?}")]
    InvalidBool(String),

    /// Char parameter was not exactly one byte.
    #[error("invalid char {0:?}")]
    InvalidChar(String),

    /// Real parameter did not parse as a decimal float.
    #[error("invalid real {0:?}")]
    InvalidReal(String),

    /// Date parameter matched none of the accepted formats.
    #[error("invalid date {0:?}")]
    InvalidDate(String),

    /// Input arrived after a previous decode error closed this decoder.
    #[error("decoder halted by a previous error")]
    Halted,
}

/// Main error type for reqbridge operations.
#[derive(Debug, Error)]
pub enum EtlError {
    /// I/O error during socket or file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol decode error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Record encode error while writing the document stream.
    #[error("stream encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Record decode error while reading a document stream back.
    #[error("stream decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Settings file could not be parsed.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// HTML import failed; the partial output stream has been closed.
    #[error("import error: {0}")]
    Import(String),
}

/// Result type alias using EtlError.
pub type Result<T> = std::result::Result<T, EtlError>;

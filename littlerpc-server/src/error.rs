//! Server error types.

use littlerpc_protocol::ProtocolError;
use thiserror::Error;

/// Errors of the hosting layer. Application and protocol failures inside a
/// dispatch never surface here; they terminate in envelopes or close codes.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

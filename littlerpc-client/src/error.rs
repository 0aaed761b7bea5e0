//! Client error types.

use littlerpc_protocol::{ProtocolError, RpcError};
use thiserror::Error;

/// Client errors.
///
/// A [`ClientError::Remote`] is distinguishable from the transport variants
/// by carrying a decoded envelope; transport failures never do.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure: the exchange produced no decodable response.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The configured async timeout elapsed before the remote completed.
    #[error("request timeout")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The remote method failed; carries the reconstructed error shape so
    /// callers can branch on `name`/`code` as they would locally.
    #[error(transparent)]
    Remote(RpcError),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl ClientError {
    /// Returns the remote error shape when the failure originated in the
    /// invoked method rather than the transport.
    pub fn remote(&self) -> Option<&RpcError> {
        match self {
            ClientError::Remote(err) => Some(err),
            _ => None,
        }
    }
}

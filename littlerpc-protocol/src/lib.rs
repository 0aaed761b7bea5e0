//! # littlerpc-protocol
//!
//! Wire protocol implementation for littlerpc.
//!
//! This crate provides:
//! - Call and response envelope types with JSON serialization
//! - The socket handshake codec (URL-safe call descriptor tokens)
//! - Error shapes carried through failure envelopes
//! - Protocol constants (close codes, default timeout)

pub mod envelope;
pub mod error;
pub mod handshake;

pub use envelope::{
    decode_call, decode_response, encode_call, encode_failure, encode_success, Call, Envelope,
    RpcError,
};
pub use error::ProtocolError;
pub use handshake::{decode_descriptor, encode_descriptor};

/// Default unary request timeout in milliseconds (async mode only).
/// A configured value of zero disables the timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Close code sent when a socket handshake does not decode.
pub const CLOSE_INVALID_HANDSHAKE: u16 = 4400;

/// Close code sent when the handshake names an unregistered socket method.
pub const CLOSE_NO_SUCH_METHOD: u16 = 4404;

/// Close code sent when a socket method fails during invocation.
pub const CLOSE_METHOD_FAILED: u16 = 4500;

/// Maximum close reason length in bytes. A close frame payload is capped at
/// 125 bytes and the first 2 carry the status code.
pub const CLOSE_REASON_MAX_BYTES: usize = 123;

//! Socket handshake codec.
//!
//! A persistent connection has no body channel before it is accepted, so
//! the call descriptor travels inside the connection address itself: the
//! JSON call, base64url-encoded, as the final path segment.

use crate::envelope::{decode_call, encode_call, Call};
use crate::error::ProtocolError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Encodes a call descriptor into a URL-safe token suitable for use as a
/// connection-address path segment.
pub fn encode_descriptor(method_name: &str, args: &[Value]) -> Result<String, ProtocolError> {
    let bytes = encode_call(method_name, args)?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// Decodes a handshake path back into a [`Call`]. A single leading path
/// separator is tolerated, so both raw tokens and request paths decode.
pub fn decode_descriptor(path: &str) -> Result<Call, ProtocolError> {
    let token = path.strip_prefix('/').unwrap_or(path);
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| ProtocolError::MalformedCall(e.to_string()))?;
    decode_call(&bytes)
}

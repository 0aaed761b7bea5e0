//! Socket method dispatch.
//!
//! Each new persistent connection carries its call descriptor in the
//! handshake path. The dispatcher decodes it, resolves the socket method,
//! and either hands the connection to the method's task or terminates it
//! with a protocol close code.

use crate::registry::SocketRegistry;
use axum::extract::ws::{CloseFrame, Utf8Bytes, WebSocket};
use littlerpc_protocol::{
    decode_descriptor, CLOSE_INVALID_HANDSHAKE, CLOSE_METHOD_FAILED, CLOSE_NO_SUCH_METHOD,
    CLOSE_REASON_MAX_BYTES,
};
use std::sync::Arc;

pub use axum::extract::ws::Message;

/// Handle to one accepted persistent connection. The registered socket
/// method owns it for the connection lifetime; the transport tears it down
/// on close.
pub struct Socket {
    inner: WebSocket,
}

impl Socket {
    pub(crate) fn new(inner: WebSocket) -> Self {
        Self { inner }
    }

    /// Sends a message on the connection.
    pub async fn send(&mut self, message: Message) -> Result<(), axum::Error> {
        self.inner.send(message).await
    }

    /// Sends a text message on the connection.
    pub async fn send_text(&mut self, text: impl Into<Utf8Bytes>) -> Result<(), axum::Error> {
        self.inner.send(Message::Text(text.into())).await
    }

    /// Receives the next message. `None` means the connection is gone.
    pub async fn recv(&mut self) -> Option<Result<Message, axum::Error>> {
        self.inner.recv().await
    }

    /// Closes the connection with a code and reason.
    pub async fn close_with(self, code: u16, reason: &str) {
        close(self.inner, code, reason).await;
    }
}

/// Resolves socket handshakes against the socket method registry.
#[derive(Clone)]
pub struct SocketDispatcher {
    registry: Arc<SocketRegistry>,
}

impl SocketDispatcher {
    pub fn new(registry: Arc<SocketRegistry>) -> Self {
        Self { registry }
    }

    /// Handles one accepted connection whose handshake path is `path`.
    /// Runs until the connection closes.
    pub async fn handle(&self, path: &str, socket: WebSocket) {
        let call = match decode_descriptor(path) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(error = %e, "invalid socket handshake");
                close(socket, CLOSE_INVALID_HANDSHAKE, "Invalid request").await;
                return;
            }
        };

        let method = match self.registry.get(&call.method_name) {
            Some(method) => method,
            None => {
                tracing::warn!(method = %call.method_name, "unknown socket method");
                let reason = format!("No such socket method: '{}'", call.method_name);
                close(socket, CLOSE_NO_SUCH_METHOD, &reason).await;
                return;
            }
        };

        match method.accept(call.args) {
            Ok(handler) => {
                tracing::debug!(method = %call.method_name, "socket method accepted");
                handler(Socket::new(socket)).await;
            }
            Err(err) => {
                tracing::warn!(method = %call.method_name, error = %err, "socket method failed");
                close(socket, CLOSE_METHOD_FAILED, &close_reason(&err.stack)).await;
            }
        }
    }
}

async fn close(mut socket: WebSocket, code: u16, reason: &str) {
    let reason = truncate_to_boundary(reason.to_string(), CLOSE_REASON_MAX_BYTES);
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from(reason),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %e, "failed to send close frame");
    }
}

/// Formats a stack string into a close reason: per-line indentation
/// stripped, then truncated to the close-frame budget.
fn close_reason(stack: &str) -> String {
    stack
        .lines()
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncates to at most `max` bytes without splitting a character.
fn truncate_to_boundary(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}

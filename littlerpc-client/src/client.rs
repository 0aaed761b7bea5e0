//! Unary client API.

use crate::error::ClientError;
use crate::socket::SocketConnection;
use crate::transport::{exchange, exchange_sync, ClientConfig};
use littlerpc_protocol::{decode_response, encode_call};
use serde_json::Value;

/// RPC client. Cheap to clone; clones share the underlying HTTP pool.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Invokes a remote method, suspending until the response arrives or
    /// the configured timeout elapses.
    pub async fn call(&self, method: &str, args: &[Value]) -> Result<Value, ClientError> {
        let body = encode_call(method, args)?;
        let bytes = exchange(&self.http, &self.config.url, body, self.config.timeout).await?;
        unwrap_envelope(&bytes)
    }

    /// Invokes a remote method, blocking the calling thread for the full
    /// round trip. No timeout is applied. Must not be called from a context
    /// that cannot tolerate blocking.
    pub fn call_sync(&self, method: &str, args: &[Value]) -> Result<Value, ClientError> {
        let body = encode_call(method, args)?;
        let bytes = exchange_sync(&self.config.url, body)?;
        unwrap_envelope(&bytes)
    }

    /// Returns a named per-method stub.
    pub fn method(&self, name: impl Into<String>) -> MethodStub {
        MethodStub {
            client: self.clone(),
            name: name.into(),
        }
    }

    /// Opens a persistent connection invoking a socket method. The default
    /// close observer reports protocol-failure closes at error level; see
    /// [`SocketConnection::set_close_observer`] to override it.
    pub async fn connect_socket(
        &self,
        method: &str,
        args: &[Value],
    ) -> Result<SocketConnection, ClientError> {
        SocketConnection::open(&self.config, method, args).await
    }
}

/// Per-method callable pair. The names exist for debuggability and mirror
/// the method they invoke.
#[derive(Clone)]
pub struct MethodStub {
    client: Client,
    name: String,
}

impl MethodStub {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the blocking variant: `<method>.sync`.
    pub fn sync_name(&self) -> String {
        format!("{}.sync", self.name)
    }

    pub async fn invoke(&self, args: &[Value]) -> Result<Value, ClientError> {
        self.client.call(&self.name, args).await
    }

    pub fn invoke_sync(&self, args: &[Value]) -> Result<Value, ClientError> {
        self.client.call_sync(&self.name, args)
    }
}

/// Decodes a response envelope; a failure envelope is raised as the
/// reconstructed remote error.
fn unwrap_envelope(bytes: &[u8]) -> Result<Value, ClientError> {
    match decode_response(bytes)?.into_result() {
        Ok(value) => Ok(value),
        Err(err) => Err(ClientError::Remote(err)),
    }
}

//! Unary call dispatch.

use crate::registry::{MethodRegistry, Outcome};
use littlerpc_protocol::{decode_call, Envelope, ProtocolError, RpcError};
use std::sync::Arc;

/// Resolves decoded calls against the method registry and normalizes
/// results into response envelopes.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<MethodRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatches raw request bytes.
    ///
    /// Returns `Err` only when the body is not valid structured data, since
    /// there is no call to answer. Every other path, including a missing or
    /// unresolvable method name and application errors, terminates in an
    /// envelope.
    pub async fn dispatch(&self, body: &[u8]) -> Result<Envelope, ProtocolError> {
        let call = match decode_call(body) {
            Ok(call) => call,
            Err(ProtocolError::MissingMethodName) => {
                return Ok(Envelope::failure(RpcError::error(
                    ProtocolError::MissingMethodName.to_string(),
                )));
            }
            Err(e) => return Err(e),
        };

        let method = match self.registry.get(&call.method_name) {
            Some(method) => method,
            None => {
                return Ok(Envelope::failure(RpcError::error(format!(
                    "No such method: '{}'",
                    call.method_name
                ))));
            }
        };

        tracing::debug!(method = %call.method_name, "dispatching call");

        let result = match method.invoke(call.args) {
            Outcome::Immediate(result) => result,
            Outcome::Deferred(fut) => fut.await,
        };

        Ok(match result {
            Ok(value) => Envelope::success(value),
            Err(err) => {
                tracing::debug!(method = %call.method_name, error = %err, "method failed");
                Envelope::failure(err)
            }
        })
    }
}

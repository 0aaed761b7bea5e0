//! JSON envelope types for calls and responses.

use crate::error::ProtocolError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A method invocation descriptor: name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Name of the method to invoke. Never empty.
    pub method_name: String,

    /// Positional arguments, order-significant, possibly empty.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Call {
    pub fn new(method_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method_name: method_name.into(),
            args,
        }
    }
}

/// Error details carried in a failure envelope.
///
/// The named fields match what a caller inspects on a local error; any
/// additional fields the server-side error carried ride along in `extra`
/// and survive the round trip verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub stack: String,

    /// Application-defined error code, absent unless the error set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,

    /// Any further fields of the original error, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RpcError {
    /// Creates an error with the given name and message. The stack defaults
    /// to the `name: message` header line a caller would see locally.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        Self {
            stack: format!("{}: {}", name, message),
            name,
            message,
            code: None,
            extra: Map::new(),
        }
    }

    /// Creates a plain error, name `"Error"`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    pub fn with_code(mut self, code: impl Into<Value>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

impl std::error::Error for RpcError {}

/// Response envelope. Exactly one of `result`/`err` is populated,
/// determined by `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<RpcError>,
}

impl Envelope {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            err: None,
        }
    }

    pub fn failure(err: RpcError) -> Self {
        Self {
            success: false,
            result: None,
            err: Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Unwraps the envelope into the value it carries. A success envelope
    /// with no result field yields `Value::Null`, matching a method that
    /// returned nothing.
    pub fn into_result(self) -> Result<Value, RpcError> {
        if self.success {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self
                .err
                .unwrap_or_else(|| RpcError::error("missing error details")))
        }
    }
}

/// Intermediate shape for decoding: tolerates an absent or null method name
/// so the dispatcher can report it as its own condition.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCall {
    #[serde(default)]
    method_name: Option<String>,
    #[serde(default)]
    args: Vec<Value>,
}

/// Serializes a call for transit.
pub fn encode_call(method_name: &str, args: &[Value]) -> Result<Bytes, ProtocolError> {
    let call = Call::new(method_name, args.to_vec());
    Ok(Bytes::from(serde_json::to_vec(&call)?))
}

/// Decodes request bytes into a [`Call`].
///
/// Fails with [`ProtocolError::MalformedCall`] when the bytes are not a
/// valid JSON object, and [`ProtocolError::MissingMethodName`] when the
/// method name is absent, null, or empty.
pub fn decode_call(bytes: &[u8]) -> Result<Call, ProtocolError> {
    let raw: RawCall = serde_json::from_slice(bytes)
        .map_err(|e| ProtocolError::MalformedCall(e.to_string()))?;
    match raw.method_name {
        Some(name) if !name.is_empty() => Ok(Call::new(name, raw.args)),
        _ => Err(ProtocolError::MissingMethodName),
    }
}

/// Serializes a success envelope.
pub fn encode_success(result: Value) -> Result<Bytes, ProtocolError> {
    Ok(Bytes::from(serde_json::to_vec(&Envelope::success(result))?))
}

/// Serializes a failure envelope. An absent `code` is omitted from the wire.
pub fn encode_failure(err: &RpcError) -> Result<Bytes, ProtocolError> {
    Ok(Bytes::from(serde_json::to_vec(&Envelope::failure(
        err.clone(),
    ))?))
}

/// Decodes response bytes into an [`Envelope`].
pub fn decode_response(bytes: &[u8]) -> Result<Envelope, ProtocolError> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| ProtocolError::MalformedResponse(e.to_string()))?;
    if !envelope.success && envelope.err.is_none() {
        return Err(ProtocolError::MalformedResponse(
            "failure envelope without err".to_string(),
        ));
    }
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_call_round_trip() {
        let bytes = encode_call("uppercase", &[json!("a"), json!("b")]).unwrap();
        let call = decode_call(&bytes).unwrap();
        assert_eq!(call.method_name, "uppercase");
        assert_eq!(call.args, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_call_wire_shape() {
        let bytes = encode_call("uppercase", &[json!("a")]).unwrap();
        assert_eq!(&bytes[..], &br#"{"methodName":"uppercase","args":["a"]}"#[..]);
    }

    #[test]
    fn test_decode_call_missing_method_name() {
        for body in [
            r#"{"args":[]}"#,
            r#"{"methodName":null,"args":[]}"#,
            r#"{"methodName":""}"#,
        ] {
            let err = decode_call(body.as_bytes()).unwrap_err();
            assert!(matches!(err, ProtocolError::MissingMethodName));
        }
    }

    #[test]
    fn test_decode_call_defaults_args() {
        let call = decode_call(br#"{"methodName":"ping"}"#).unwrap();
        assert!(call.args.is_empty());
    }

    #[test]
    fn test_decode_call_malformed() {
        let err = decode_call(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedCall(_)));
    }

    #[test]
    fn test_success_wire_shape() {
        let bytes = encode_success(json!(["A", "B"])).unwrap();
        assert_eq!(&bytes[..], &br#"{"success":true,"result":["A","B"]}"#[..]);
    }

    #[test]
    fn test_failure_omits_absent_code() {
        let bytes = encode_failure(&RpcError::error("nah!")).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(!text.contains("\"code\""));
        assert!(text.contains(r#""success":false"#));
        assert!(text.contains(r#""message":"nah!""#));
    }

    #[test]
    fn test_failure_carries_code() {
        let err = RpcError::error("denied").with_code("EACCES");
        let bytes = encode_failure(&err).unwrap();
        let envelope = decode_response(&bytes).unwrap();
        assert_eq!(envelope.err.unwrap().code, Some(json!("EACCES")));
    }

    #[test]
    fn test_custom_error_fields_survive() {
        let body = br#"{"success":false,"err":{"name":"DbError","message":"m","stack":"s","retries":3}}"#;
        let envelope = decode_response(body).unwrap();
        let err = envelope.err.unwrap();
        assert_eq!(err.extra.get("retries"), Some(&json!(3)));

        let re_encoded = encode_failure(&err).unwrap();
        let text = std::str::from_utf8(&re_encoded).unwrap();
        assert!(text.contains(r#""retries":3"#));
    }

    #[test]
    fn test_decode_response_malformed() {
        assert!(matches!(
            decode_response(b"[1,2").unwrap_err(),
            ProtocolError::MalformedResponse(_)
        ));
        // A failure flag without error details is not a valid envelope.
        assert!(matches!(
            decode_response(br#"{"success":false}"#).unwrap_err(),
            ProtocolError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            Envelope::success(json!(1)).into_result().unwrap(),
            json!(1)
        );
        let err = Envelope::failure(RpcError::error("nah!"))
            .into_result()
            .unwrap_err();
        assert_eq!(err.message, "nah!");

        // A success envelope with no result reads as null.
        let envelope = decode_response(br#"{"success":true}"#).unwrap();
        assert_eq!(envelope.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn test_rpc_error_display() {
        let err = RpcError::new("TypeError", "not a string");
        assert_eq!(err.to_string(), "TypeError: not a string");
        assert_eq!(err.stack, "TypeError: not a string");
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_call_round_trip(
            name in "[a-zA-Z][a-zA-Z0-9_]{0,12}",
            args in prop::collection::vec(arb_json(), 0..4),
        ) {
            let bytes = encode_call(&name, &args).unwrap();
            let call = decode_call(&bytes).unwrap();
            prop_assert_eq!(call.method_name, name);
            prop_assert_eq!(call.args, args);
        }
    }
}

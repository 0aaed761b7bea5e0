//! Protocol error types.

use thiserror::Error;

/// Errors produced while encoding or decoding protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request body or handshake token is not valid structured data.
    #[error("malformed call: {0}")]
    MalformedCall(String),

    /// The call parsed but carries no method name.
    #[error("No method name specified")]
    MissingMethodName,

    /// The response body is not a valid envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_method_name_message() {
        // The display string is surfaced verbatim in failure envelopes.
        assert_eq!(
            ProtocolError::MissingMethodName.to_string(),
            "No method name specified"
        );
    }

    #[test]
    fn test_malformed_call_display() {
        let err = ProtocolError::MalformedCall("expected object".to_string());
        assert!(err.to_string().contains("expected object"));
    }
}

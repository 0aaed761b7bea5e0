//! Socket method connections.
//!
//! A socket method is invoked by opening a persistent connection whose
//! handshake path carries the encoded call descriptor. After the handshake
//! everything on the wire is free-form messaging owned by the caller.

use crate::error::ClientError;
use crate::transport::ClientConfig;
use futures_util::{SinkExt, StreamExt};
use littlerpc_protocol::{encode_descriptor, CLOSE_METHOD_FAILED, CLOSE_NO_SUCH_METHOD};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// A close event observed on a persistent connection.
#[derive(Debug, Clone)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
}

type CloseObserver = Arc<dyn Fn(&CloseEvent) + Send + Sync>;

/// Handle to one persistent-connection method invocation.
pub struct SocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    observer: CloseObserver,
    observed: bool,
}

impl SocketConnection {
    pub(crate) async fn open(
        config: &ClientConfig,
        method: &str,
        args: &[Value],
    ) -> Result<Self, ClientError> {
        let token = encode_descriptor(method, args)?;
        let url = socket_url(&config.url, &token)?;
        tracing::debug!(%url, method, "opening socket method connection");
        let (stream, _response) = connect_async(url).await?;
        Ok(Self {
            stream,
            observer: Arc::new(default_observer),
            observed: false,
        })
    }

    /// Replaces the default close observer. Takes effect for close frames
    /// received after the call.
    pub fn set_close_observer(&mut self, observer: impl Fn(&CloseEvent) + Send + Sync + 'static) {
        self.observer = Arc::new(observer);
    }

    /// Sends a message on the connection.
    pub async fn send(&mut self, message: Message) -> Result<(), ClientError> {
        Ok(self.stream.send(message).await?)
    }

    /// Sends a text message on the connection.
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), ClientError> {
        self.send(Message::text(text.into())).await
    }

    /// Receives the next message. A close frame is reported to the close
    /// observer before being returned; `None` means the connection is gone.
    pub async fn recv(&mut self) -> Option<Result<Message, ClientError>> {
        match self.stream.next().await {
            Some(Ok(message)) => {
                if let Message::Close(frame) = &message {
                    let event = frame
                        .as_ref()
                        .map(|f| CloseEvent {
                            code: u16::from(f.code),
                            reason: f.reason.as_str().to_string(),
                        })
                        .unwrap_or(CloseEvent {
                            // 1005: closed without a status code.
                            code: 1005,
                            reason: String::new(),
                        });
                    self.observe(&event);
                }
                Some(Ok(message))
            }
            Some(Err(e)) => Some(Err(e.into())),
            None => None,
        }
    }

    /// Closes the connection.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        Ok(self.stream.close(None).await?)
    }

    fn observe(&mut self, event: &CloseEvent) {
        if !self.observed {
            self.observed = true;
            (self.observer)(event);
        }
    }
}

/// Default close reporting: protocol failure codes at error level,
/// everything else at warn.
fn default_observer(event: &CloseEvent) {
    match event.code {
        CLOSE_NO_SUCH_METHOD | CLOSE_METHOD_FAILED => {
            tracing::error!(code = event.code, reason = %event.reason, "socket method closed with error");
        }
        _ => {
            tracing::warn!(code = event.code, reason = %event.reason, "socket method closed");
        }
    }
}

/// Rewrites a base URL scheme to its persistent-connection equivalent and
/// appends the handshake token as the final path segment.
fn socket_url(base: &str, token: &str) -> Result<String, ClientError> {
    let ws_base = if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(ClientError::InvalidUrl(base.to_string()));
    };
    Ok(format!("{}/{}", ws_base.trim_end_matches('/'), token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use littlerpc_protocol::RpcError;
    use littlerpc_server::Message as WsMessage;
    use littlerpc_server::{Config, MethodRegistry, Server, SocketRegistry};
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_socket_url_rewrites_scheme() {
        assert_eq!(
            socket_url("http://localhost:8080", "abc").unwrap(),
            "ws://localhost:8080/abc"
        );
        assert_eq!(
            socket_url("https://api.example.com/", "abc").unwrap(),
            "wss://api.example.com/abc"
        );
        assert_eq!(
            socket_url("ws://localhost:8080", "abc").unwrap(),
            "ws://localhost:8080/abc"
        );
        assert!(matches!(
            socket_url("ftp://nope", "abc").unwrap_err(),
            ClientError::InvalidUrl(_)
        ));
    }

    fn socket_registry() -> Arc<SocketRegistry> {
        Arc::new(
            SocketRegistry::builder()
                .register("echoSocket", |mut socket, _args| async move {
                    while let Some(Ok(message)) = socket.recv().await {
                        if let WsMessage::Text(text) = message {
                            if socket.send(WsMessage::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }
                })
                .register("uppercaseSocket", |mut socket, args| async move {
                    let repeat = args
                        .first()
                        .and_then(Value::as_u64)
                        .unwrap_or(1) as usize;
                    while let Some(Ok(message)) = socket.recv().await {
                        if let WsMessage::Text(text) = message {
                            let reply = text.as_str().to_uppercase().repeat(repeat);
                            if socket.send_text(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                })
                .register_with("errorSocket", |args| {
                    let message = args
                        .first()
                        .and_then(Value::as_str)
                        .unwrap_or("socket error")
                        .to_string();
                    Err(RpcError::error(message))
                })
                .build(),
        )
    }

    async fn spawn_server() -> String {
        let server = Server::new(
            Config::default(),
            Arc::new(MethodRegistry::builder().build()),
            socket_registry(),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, server.router()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_echo_socket_round_trip() {
        let url = spawn_server().await;
        let client = Client::new(ClientConfig::new(url));
        let mut conn = client.connect_socket("echoSocket", &[]).await.unwrap();

        conn.send_text("hello").await.unwrap();
        let reply = conn.recv().await.unwrap().unwrap();
        assert_eq!(reply.into_text().unwrap().as_str(), "hello");
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_socket_method_args_reach_handler() {
        let url = spawn_server().await;
        let client = Client::new(ClientConfig::new(url));
        let mut conn = client
            .connect_socket("uppercaseSocket", &[json!(2)])
            .await
            .unwrap();

        conn.send_text("ab").await.unwrap();
        let reply = conn.recv().await.unwrap().unwrap();
        assert_eq!(reply.into_text().unwrap().as_str(), "ABAB");
    }

    #[tokio::test]
    async fn test_close_observer_sees_method_failure() {
        let url = spawn_server().await;
        let client = Client::new(ClientConfig::new(url));
        let mut conn = client
            .connect_socket("errorSocket", &[json!("kaboom")])
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        conn.set_close_observer(move |event: &CloseEvent| {
            let _ = tx.send(event.clone());
        });

        // Drain until the close frame arrives.
        while let Some(Ok(message)) = conn.recv().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }

        let event = rx.recv().await.unwrap();
        assert_eq!(event.code, 4500);
        assert!(event.reason.contains("kaboom"));
    }

    #[tokio::test]
    async fn test_close_observer_sees_unknown_method() {
        let url = spawn_server().await;
        let client = Client::new(ClientConfig::new(url));
        let mut conn = client.connect_socket("missingSocket", &[]).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        conn.set_close_observer(move |event: &CloseEvent| {
            let _ = tx.send(event.clone());
        });

        while let Some(Ok(message)) = conn.recv().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }

        let event = rx.recv().await.unwrap();
        assert_eq!(event.code, 4404);
        assert!(event.reason.contains("missingSocket"));
    }
}

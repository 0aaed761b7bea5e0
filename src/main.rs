//! littlerpc demo server.
//!
//! Hosts a small method registry over HTTP and WebSocket.

use littlerpc_protocol::RpcError;
use littlerpc_server::{Config, MethodRegistry, Server, SocketRegistry};
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn uppercase_words(args: &[Value]) -> Result<Value, RpcError> {
    args.iter()
        .map(|word| {
            word.as_str()
                .map(|w| Value::String(w.to_uppercase()))
                .ok_or_else(|| RpcError::new("TypeError", "expected a string"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn methods() -> Arc<MethodRegistry> {
    Arc::new(
        MethodRegistry::builder()
            .register("uppercase", |args| uppercase_words(&args))
            .register_async("uppercaseAsync", |args| async move {
                uppercase_words(&args)
            })
            .register("throwErr", |_args| Err(RpcError::error("nah!")))
            .register_async("rejectErr", |_args| async move {
                Err(RpcError::error("nope!!!"))
            })
            .build(),
    )
}

fn socket_methods() -> Arc<SocketRegistry> {
    use littlerpc_server::Message;

    Arc::new(
        SocketRegistry::builder()
            .register("echoSocket", |mut socket, _args| async move {
                while let Some(Ok(message)) = socket.recv().await {
                    if let Message::Text(text) = message {
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                }
            })
            .register("uppercaseSocket", |mut socket, args| async move {
                let repeat = args.first().and_then(Value::as_u64).unwrap_or(1) as usize;
                while let Some(Ok(message)) = socket.recv().await {
                    if let Message::Text(text) = message {
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("LITTLERPC_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            if std::env::var("LITTLERPC_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    tracing::info!("Starting littlerpc server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Body limit: {} MB", config.http.body_limit_mb);
    tracing::info!(
        "  CORS: {}",
        if config.http.cors_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let server = Server::new(config, methods(), socket_methods());
    server.run().await?;

    Ok(())
}

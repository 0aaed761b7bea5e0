//! HTTP hosting glue.
//!
//! Mounts the unary endpoint at `POST /` and socket handshakes at
//! `GET /<token>` on an axum router. Body size limits and cross-origin
//! policy are externally configured knobs, not part of the protocol.

use crate::config::{Config, HttpConfig};
use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::registry::{MethodRegistry, SocketRegistry};
use crate::socket::SocketDispatcher;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State, WebSocketUpgrade};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    sockets: SocketDispatcher,
}

/// RPC server over HTTP and WebSocket.
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    pub fn new(
        config: Config,
        methods: Arc<MethodRegistry>,
        socket_methods: Arc<SocketRegistry>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                dispatcher: Dispatcher::new(methods),
                sockets: SocketDispatcher::new(socket_methods),
            },
        }
    }

    /// Builds the axum router. Exposed so callers can mount it on their own
    /// listener.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/", post(rpc_endpoint))
            .route("/{token}", get(socket_endpoint))
            .with_state(self.state.clone())
            .layer(DefaultBodyLimit::max(self.config.http.body_limit()));

        if self.config.http.cors_enabled {
            router = router.layer(cors_layer(&self.config.http));
        }

        router
    }

    /// Binds the configured address and serves until the task is dropped.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.network.bind_addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

fn cors_layer(config: &HttpConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Unary endpoint. Success envelopes go out with status 200, failure
/// envelopes with 500; the envelope flag is what clients consult.
async fn rpc_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    match state.dispatcher.dispatch(&body).await {
        Ok(envelope) => {
            let status = if envelope.is_success() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(envelope)).into_response()
        }
        Err(e) => {
            tracing::debug!(error = %e, "unparseable request body");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Socket endpoint. The call descriptor rides in the path; dispatch
/// happens after the upgrade completes.
async fn socket_endpoint(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let sockets = state.sockets.clone();
    ws.on_upgrade(move |socket| async move { sockets.handle(&token, socket).await })
}

//! # littlerpc-server
//!
//! RPC server for littlerpc.
//!
//! This crate provides:
//! - Unary and socket method registries, built once and immutable afterward
//! - Call dispatch with success/failure envelope normalization
//! - Socket handshake dispatch with protocol close codes
//! - HTTP and WebSocket hosting glue on axum
//! - YAML/env configuration

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod registry;
pub mod socket;

pub use config::{Config, HttpConfig, NetworkConfig};
pub use dispatch::Dispatcher;
pub use error::ServerError;
pub use http::Server;
pub use registry::{
    Method, MethodRegistry, MethodRegistryBuilder, Outcome, SocketHandler, SocketMethod,
    SocketRegistry, SocketRegistryBuilder,
};
pub use socket::{Message, Socket, SocketDispatcher};

//! # littlerpc-client
//!
//! Client library for littlerpc.
//!
//! This crate provides:
//! - Async and blocking unary invocations over HTTP
//! - Per-method stubs with introspectable names
//! - Socket method connections over WebSocket with close-event reporting

pub mod client;
pub mod error;
pub mod socket;
pub mod transport;

pub use client::{Client, MethodStub};
pub use error::ClientError;
pub use socket::{CloseEvent, SocketConnection};
pub use transport::ClientConfig;

//! Method registries.
//!
//! Both registries map a method name to a callable. They are assembled with
//! a builder at server construction and immutable afterward, so they can be
//! shared across concurrently dispatched calls without locking.

use crate::socket::Socket;
use futures_util::future::BoxFuture;
use littlerpc_protocol::RpcError;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Outcome of invoking a unary method: a result available immediately, or
/// one the dispatcher must await. The variant is fixed at registration
/// time, not inferred from the returned value.
pub enum Outcome {
    Immediate(Result<Value, RpcError>),
    Deferred(BoxFuture<'static, Result<Value, RpcError>>),
}

/// A registered unary method.
pub trait Method: Send + Sync {
    fn invoke(&self, args: Vec<Value>) -> Outcome;
}

struct SyncMethod<F>(F);

impl<F> Method for SyncMethod<F>
where
    F: Fn(Vec<Value>) -> Result<Value, RpcError> + Send + Sync,
{
    fn invoke(&self, args: Vec<Value>) -> Outcome {
        Outcome::Immediate((self.0)(args))
    }
}

struct AsyncMethod<F>(F);

impl<F, Fut> Method for AsyncMethod<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    fn invoke(&self, args: Vec<Value>) -> Outcome {
        Outcome::Deferred(Box::pin((self.0)(args)))
    }
}

/// Unary method registry.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<dyn Method>>,
}

impl MethodRegistry {
    pub fn builder() -> MethodRegistryBuilder {
        MethodRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Method>> {
        self.methods.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Builder for [`MethodRegistry`].
#[derive(Default)]
pub struct MethodRegistryBuilder {
    methods: HashMap<String, Arc<dyn Method>>,
}

impl MethodRegistryBuilder {
    /// Registers a method whose result is available immediately.
    pub fn register<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(SyncMethod(f)));
        self
    }

    /// Registers a method that resolves its result asynchronously; the
    /// dispatcher awaits it before producing an envelope.
    pub fn register_async<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        self.methods.insert(name.into(), Arc::new(AsyncMethod(f)));
        self
    }

    pub fn build(self) -> MethodRegistry {
        MethodRegistry {
            methods: self.methods,
        }
    }
}

/// The connection task a socket method hands back once it has accepted a
/// call: given ownership of the socket, it runs for the connection
/// lifetime.
pub type SocketHandler = Box<dyn FnOnce(Socket) -> BoxFuture<'static, ()> + Send>;

/// A registered socket method.
///
/// `accept` runs synchronously at connection-establishment time; an error
/// closes the connection with the method-failure close code before any
/// messages flow.
pub trait SocketMethod: Send + Sync {
    fn accept(&self, args: Vec<Value>) -> Result<SocketHandler, RpcError>;
}

struct FnSocketMethod<F>(F);

impl<F> SocketMethod for FnSocketMethod<F>
where
    F: Fn(Vec<Value>) -> Result<SocketHandler, RpcError> + Send + Sync,
{
    fn accept(&self, args: Vec<Value>) -> Result<SocketHandler, RpcError> {
        (self.0)(args)
    }
}

/// Socket method registry.
#[derive(Default)]
pub struct SocketRegistry {
    methods: HashMap<String, Arc<dyn SocketMethod>>,
}

impl SocketRegistry {
    pub fn builder() -> SocketRegistryBuilder {
        SocketRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SocketMethod>> {
        self.methods.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Builder for [`SocketRegistry`].
#[derive(Default)]
pub struct SocketRegistryBuilder {
    methods: HashMap<String, Arc<dyn SocketMethod>>,
}

impl SocketRegistryBuilder {
    /// Registers a socket method that always accepts the connection and
    /// runs `f` for its lifetime.
    pub fn register<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Socket, Vec<Value>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_with(name, move |args| {
            let f = f.clone();
            let handler: SocketHandler = Box::new(move |socket| {
                let fut: BoxFuture<'static, ()> = Box::pin(f(socket, args));
                fut
            });
            Ok(handler)
        })
    }

    /// Registers a socket method that may reject the connection while
    /// inspecting its arguments.
    pub fn register_with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<SocketHandler, RpcError> + Send + Sync + 'static,
    {
        self.methods
            .insert(name.into(), Arc::new(FnSocketMethod(f)));
        self
    }

    pub fn build(self) -> SocketRegistry {
        SocketRegistry {
            methods: self.methods,
        }
    }
}

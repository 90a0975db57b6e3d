use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::http::request::Request;
use crate::http::response::Response;

/// Boxed future returned by handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A routed request handler. Cloned freely and invoked concurrently by
/// many connection engines.
pub type HandlerFn = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

/// Wraps a handler to provide cross-cutting behavior.
pub type Middleware = Arc<dyn Fn(HandlerFn) -> HandlerFn + Send + Sync>;

/// Adapts an async closure into a [`HandlerFn`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

struct RouterInner {
    routes: HashMap<String, HandlerFn>,
    middlewares: Vec<Middleware>,
}

/// Maps `METHOD:PATH` keys to handlers and carries the middleware chain.
///
/// Registration must happen before serving starts; the lock exists so that
/// unsupported late registration stays memory-safe rather than being
/// guarded against at the type level.
pub struct Router {
    inner: RwLock<RouterInner>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RouterInner {
                routes: HashMap::new(),
                middlewares: Vec::new(),
            }),
        }
    }

    /// Appends middleware to the chain in registration order. The first
    /// registered middleware becomes the outermost wrapper.
    pub fn use_middleware(&self, middleware: Middleware) {
        self.inner.write().middlewares.push(middleware);
    }

    /// Maps a method/path pair to a handler.
    pub fn register(&self, method: &str, path: &str, handler: HandlerFn) {
        self.inner
            .write()
            .routes
            .insert(route_key(method, path), handler);
    }

    /// Returns the bare handler for a method/path pair, without middleware.
    pub fn lookup(&self, method: &str, path: &str) -> Option<HandlerFn> {
        self.inner.read().routes.get(&route_key(method, path)).cloned()
    }

    /// Returns the handler wrapped with a snapshot of the middleware chain.
    pub fn resolve(&self, method: &str, path: &str) -> Option<HandlerFn> {
        let (handler, middlewares) = {
            let inner = self.inner.read();
            let handler = inner.routes.get(&route_key(method, path))?.clone();
            (handler, inner.middlewares.clone())
        };

        let mut wrapped = handler;
        for middleware in middlewares.iter().rev() {
            wrapped = middleware(wrapped);
        }
        Some(wrapped)
    }

    /// Returns the HTTP methods registered for a path, ASCII-sorted and
    /// deduplicated. Feeds the 405 fallback's `Allow` header.
    pub fn allowed_methods(&self, path: &str) -> Vec<String> {
        let inner = self.inner.read();
        let suffix = format!(":{}", path);

        let methods: BTreeSet<String> = inner
            .routes
            .keys()
            .filter_map(|key| key.strip_suffix(&suffix))
            .filter(|method| !method.is_empty())
            .map(|method| method.to_string())
            .collect();

        methods.into_iter().collect()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the router lookup key in `METHOD:PATH` format.
fn route_key(method: &str, path: &str) -> String {
    format!("{}:{}", method.to_ascii_uppercase(), path)
}

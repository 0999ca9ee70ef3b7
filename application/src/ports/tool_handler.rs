//! Tool handler port
//!
//! Handlers perform the actual I/O behind a registered tool (market data,
//! balance queries, order placement). The registry stores every handler as
//! an `Arc<dyn ToolHandler>`; closures are adapted with [`handler_fn`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// A single tool implementation.
///
/// `Ok` is the `{status: success, result}` arm, `Err` the error arm. Panics
/// are caught by the registry and reported as `HANDLER_PANIC`.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: &Map<String, Value>) -> Result<Value, String>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, String>> + Send,
{
    async fn handle(&self, args: &Map<String, Value>) -> Result<Value, String> {
        (self.f)(args.clone()).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

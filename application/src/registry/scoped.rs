//! Phase-scoped registry view.
//!
//! Built by the orchestrator for every planned phase: only the phase's
//! allowlisted tools are visible, and calls are delegated unchanged to the
//! full registry.

use crate::ports::tool_executor::ToolExecutorPort;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;
use tradegate_domain::{ToolCall, ToolDescriptor, ToolError, ToolResult};

pub struct ScopedRegistry {
    inner: Arc<dyn ToolExecutorPort>,
    allowed: BTreeSet<String>,
}

impl ScopedRegistry {
    pub fn new<I, S>(inner: Arc<dyn ToolExecutorPort>, allowlist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            allowed: allowlist.into_iter().map(Into::into).collect(),
        }
    }

    fn visible(&self, name: &str) -> bool {
        self.allowed.contains(name)
    }
}

#[async_trait]
impl ToolExecutorPort for ScopedRegistry {
    fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        if self.visible(name) {
            self.inner.descriptor(name)
        } else {
            None
        }
    }

    fn tool_names(&self) -> Vec<&str> {
        self.inner
            .tool_names()
            .into_iter()
            .filter(|name| self.visible(name))
            .collect()
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if !self.visible(&call.tool_name) {
            warn!(tool = %call.tool_name, "Call outside the phase allowlist");
            return ToolResult::failure(
                &call.tool_name,
                ToolError::not_found(format!("{} (not allowed in this phase)", call.tool_name)),
            );
        }
        self.inner.execute(call).await
    }
}

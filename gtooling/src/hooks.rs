//! Lifecycle hooks for tool dispatch.
//!
//! ```rust
//! use gtooling::{NoopToolBridgeHooks, ToolBridgeHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn ToolBridgeHooks) {}
//!
//! assert_hooks_trait(&NoopToolBridgeHooks);
//! ```

use std::time::Duration;

use gprovider::ToolCall;

use crate::{ToolError, ToolExecutionContext, ToolExecutionResult};

pub trait ToolBridgeHooks: Send + Sync {
    fn on_dispatch_start(&self, _tool_call: &ToolCall, _context: &ToolExecutionContext) {}

    fn on_dispatch_success(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _result: &ToolExecutionResult,
        _elapsed: Duration,
    ) {
    }

    fn on_dispatch_failure(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolBridgeHooks;

impl ToolBridgeHooks for NoopToolBridgeHooks {}

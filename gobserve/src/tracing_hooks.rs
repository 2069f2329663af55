//! `tracing` events for provider calls and tool dispatch.
//!
//! ```rust
//! use gobserve::TracingObservabilityHooks;
//! use gtooling::ToolBridgeHooks;
//!
//! fn accepts_tool_hooks(_hooks: &dyn ToolBridgeHooks) {}
//!
//! accepts_tool_hooks(&TracingObservabilityHooks);
//! ```

use std::time::Duration;

use gprovider::{ProviderError, ProviderOperationHooks, ToolCall};
use gtooling::{ToolBridgeHooks, ToolError, ToolExecutionContext, ToolExecutionResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_call_start(&self, provider: &str, operation: &str, model: &str) {
        tracing::debug!(
            phase = "provider",
            event = "call_start",
            provider,
            operation,
            model
        );
    }

    fn on_success(&self, provider: &str, operation: &str, elapsed: Duration) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider,
            operation,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_failure(&self, provider: &str, operation: &str, elapsed: Duration, error: &ProviderError) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider,
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl ToolBridgeHooks for TracingObservabilityHooks {
    fn on_dispatch_start(&self, tool_call: &ToolCall, context: &ToolExecutionContext) {
        tracing::info!(
            phase = "tool",
            event = "dispatch_start",
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            request_id = %context.request_id
        );
    }

    fn on_dispatch_success(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "tool",
            event = "dispatch_success",
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            request_id = %context.request_id,
            output_len = result.output.len(),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_dispatch_failure(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        tracing::warn!(
            phase = "tool",
            event = "dispatch_failure",
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            request_id = %context.request_id,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            recoverable = error.is_recoverable(),
            error = %error
        );
    }
}

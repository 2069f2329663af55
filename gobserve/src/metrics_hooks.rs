//! `metrics` counters and histograms for provider calls and tool dispatch.
//!
//! ```rust
//! use gobserve::MetricsObservabilityHooks;
//! use gprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! accepts_provider_hooks(&MetricsObservabilityHooks);
//! ```

use std::time::Duration;

use gprovider::{ProviderError, ProviderOperationHooks, ToolCall};
use gtooling::{ToolBridgeHooks, ToolError, ToolExecutionContext, ToolExecutionResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_call_start(&self, provider: &str, operation: &str, _model: &str) {
        metrics::counter!(
            "gatehouse_provider_call_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_success(&self, provider: &str, operation: &str, elapsed: Duration) {
        metrics::counter!(
            "gatehouse_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "gatehouse_provider_call_duration_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_failure(&self, provider: &str, operation: &str, elapsed: Duration, error: &ProviderError) {
        metrics::counter!(
            "gatehouse_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "gatehouse_provider_call_duration_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl ToolBridgeHooks for MetricsObservabilityHooks {
    fn on_dispatch_start(&self, tool_call: &ToolCall, _context: &ToolExecutionContext) {
        metrics::counter!(
            "gatehouse_tool_dispatch_start_total",
            "tool_name" => tool_call.name.clone()
        )
        .increment(1);
    }

    fn on_dispatch_success(
        &self,
        tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "gatehouse_tool_dispatch_success_total",
            "tool_name" => tool_call.name.clone()
        )
        .increment(1);
        metrics::histogram!(
            "gatehouse_tool_dispatch_duration_seconds",
            "tool_name" => tool_call.name.clone(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_dispatch_failure(
        &self,
        tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "gatehouse_tool_dispatch_failure_total",
            "tool_name" => tool_call.name.clone(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "gatehouse_tool_dispatch_duration_seconds",
            "tool_name" => tool_call.name.clone(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

//! Hook combinators: panic isolation and fan-out to several sinks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use gprovider::{ProviderError, ProviderOperationHooks, ToolCall};
use gtooling::{ToolBridgeHooks, ToolError, ToolExecutionContext, ToolExecutionResult};

/// Swallows panics raised by the wrapped provider hooks.
pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_call_start(&self, provider: &str, operation: &str, model: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_call_start(provider, operation, model)
        }));
    }

    fn on_success(&self, provider: &str, operation: &str, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, operation, elapsed)
        }));
    }

    fn on_failure(&self, provider: &str, operation: &str, elapsed: Duration, error: &ProviderError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, operation, elapsed, error)
        }));
    }
}

/// Swallows panics raised by the wrapped tool bridge hooks.
pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolBridgeHooks for SafeToolHooks<H>
where
    H: ToolBridgeHooks,
{
    fn on_dispatch_start(&self, tool_call: &ToolCall, context: &ToolExecutionContext) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_dispatch_start(tool_call, context)
        }));
    }

    fn on_dispatch_success(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_dispatch_success(tool_call, context, result, elapsed)
        }));
    }

    fn on_dispatch_failure(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_dispatch_failure(tool_call, context, error, elapsed)
        }));
    }
}

/// Forwards every provider callback to each sink in order.
#[derive(Default, Clone)]
pub struct FanoutProviderHooks {
    sinks: Vec<Arc<dyn ProviderOperationHooks>>,
}

impl FanoutProviderHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProviderOperationHooks>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ProviderOperationHooks for FanoutProviderHooks {
    fn on_call_start(&self, provider: &str, operation: &str, model: &str) {
        for sink in &self.sinks {
            sink.on_call_start(provider, operation, model);
        }
    }

    fn on_success(&self, provider: &str, operation: &str, elapsed: Duration) {
        for sink in &self.sinks {
            sink.on_success(provider, operation, elapsed);
        }
    }

    fn on_failure(&self, provider: &str, operation: &str, elapsed: Duration, error: &ProviderError) {
        for sink in &self.sinks {
            sink.on_failure(provider, operation, elapsed, error);
        }
    }
}

/// Forwards every tool bridge callback to each sink in order.
#[derive(Default, Clone)]
pub struct FanoutToolHooks {
    sinks: Vec<Arc<dyn ToolBridgeHooks>>,
}

impl FanoutToolHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ToolBridgeHooks>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ToolBridgeHooks for FanoutToolHooks {
    fn on_dispatch_start(&self, tool_call: &ToolCall, context: &ToolExecutionContext) {
        for sink in &self.sinks {
            sink.on_dispatch_start(tool_call, context);
        }
    }

    fn on_dispatch_success(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        for sink in &self.sinks {
            sink.on_dispatch_success(tool_call, context, result, elapsed);
        }
    }

    fn on_dispatch_failure(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        for sink in &self.sinks {
            sink.on_dispatch_failure(tool_call, context, error, elapsed);
        }
    }
}

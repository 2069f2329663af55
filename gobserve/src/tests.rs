use std::sync::{Arc, Mutex};
use std::time::Duration;

use gprovider::{
    BoxedEventStream, Message, ModelProvider, ModelRequest, ModelResponse, ObservedProvider,
    OutputItem, ProviderError, ProviderFuture, ProviderOperationHooks, Role, StopReason,
    TokenUsage, ToolCall, ToolDefinition, VecEventStream,
};
use gtooling::{
    FnToolExecutor, ToolBridge, ToolBridgeHooks, ToolCatalog, ToolError, ToolExecutionContext,
    ToolExecutionResult,
};

use crate::{
    FanoutProviderHooks, FanoutToolHooks, MetricsObservabilityHooks, SafeProviderHooks,
    SafeToolHooks, TracingObservabilityHooks,
};

fn sample_tool_call() -> ToolCall {
    ToolCall {
        id: "call-1".to_string(),
        name: "echo".to_string(),
        arguments: "{}".to_string(),
    }
}

fn sample_tool_context() -> ToolExecutionContext {
    ToolExecutionContext::new("req-1").with_metadata("model", "gpt-4o")
}

fn drive_provider_hooks(hooks: &dyn ProviderOperationHooks) {
    let error = ProviderError::timeout("provider timeout");
    hooks.on_call_start("OpenAI", "stream", "gpt-4o");
    hooks.on_success("OpenAI", "stream", Duration::from_millis(10));
    hooks.on_failure("OpenAI", "complete", Duration::from_millis(20), &error);
}

fn drive_tool_hooks(hooks: &dyn ToolBridgeHooks) {
    let error = ToolError::execution("tool failed");
    hooks.on_dispatch_start(&sample_tool_call(), &sample_tool_context());
    hooks.on_dispatch_success(
        &sample_tool_call(),
        &sample_tool_context(),
        &ToolExecutionResult::new("call-1", "ok"),
        Duration::from_millis(20),
    );
    hooks.on_dispatch_failure(
        &sample_tool_call(),
        &sample_tool_context(),
        &error,
        Duration::from_millis(20),
    );
}

#[test]
fn tracing_and_metrics_hooks_accept_every_callback() {
    drive_provider_hooks(&TracingObservabilityHooks);
    drive_tool_hooks(&TracingObservabilityHooks);
    drive_provider_hooks(&MetricsObservabilityHooks);
    drive_tool_hooks(&MetricsObservabilityHooks);
}

#[derive(Default, Clone)]
struct Recording {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl Recording {
    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }

    fn take(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.events.lock().expect("events lock"))
    }
}

impl ProviderOperationHooks for Recording {
    fn on_call_start(&self, _provider: &str, _operation: &str, _model: &str) {
        self.push("start");
    }

    fn on_success(&self, _provider: &str, _operation: &str, _elapsed: Duration) {
        self.push("success");
    }

    fn on_failure(
        &self,
        _provider: &str,
        _operation: &str,
        _elapsed: Duration,
        _error: &ProviderError,
    ) {
        self.push("failure");
    }
}

impl ToolBridgeHooks for Recording {
    fn on_dispatch_start(&self, _tool_call: &ToolCall, _context: &ToolExecutionContext) {
        self.push("start");
    }

    fn on_dispatch_success(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _result: &ToolExecutionResult,
        _elapsed: Duration,
    ) {
        self.push("success");
    }

    fn on_dispatch_failure(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
        self.push("failure");
    }
}

struct Panicking;

impl ProviderOperationHooks for Panicking {
    fn on_call_start(&self, _provider: &str, _operation: &str, _model: &str) {
        panic!("start panic");
    }

    fn on_success(&self, _provider: &str, _operation: &str, _elapsed: Duration) {
        panic!("success panic");
    }
}

impl ToolBridgeHooks for Panicking {
    fn on_dispatch_start(&self, _tool_call: &ToolCall, _context: &ToolExecutionContext) {
        panic!("start panic");
    }

    fn on_dispatch_success(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _result: &ToolExecutionResult,
        _elapsed: Duration,
    ) {
        panic!("success panic");
    }
}

#[test]
fn safe_hooks_delegate_and_fanout_reaches_every_sink() {
    let first = Recording::default();
    let second = Recording::default();
    let fanout = FanoutProviderHooks::new()
        .with(Arc::new(SafeProviderHooks::new(first.clone())))
        .with(Arc::new(second.clone()));
    assert_eq!(fanout.len(), 2);

    drive_provider_hooks(&fanout);
    assert_eq!(first.take(), vec!["start", "success", "failure"]);
    assert_eq!(second.take(), vec!["start", "success", "failure"]);

    let tools = FanoutToolHooks::new().with(Arc::new(SafeToolHooks::new(first.clone())));
    drive_tool_hooks(&tools);
    assert_eq!(first.take(), vec!["start", "success", "failure"]);
}

#[test]
fn safe_hooks_swallow_panics() {
    drive_provider_hooks(&SafeProviderHooks::new(Panicking));
    drive_tool_hooks(&SafeToolHooks::new(Panicking));
}

struct FixedProvider;

impl ModelProvider for FixedProvider {
    fn name(&self) -> &str {
        "Fixed"
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            Ok(ModelResponse {
                provider: "Fixed".to_string(),
                model: request.model,
                output: vec![OutputItem::Message(Message::new(Role::Assistant, "hi"))],
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        })
    }

    fn stream<'a>(
        &'a self,
        _request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move { Ok(Box::pin(VecEventStream::new(Vec::new())) as BoxedEventStream<'a>) })
    }
}

#[tokio::test]
async fn panicking_hooks_do_not_break_provider_calls_or_tool_dispatch() {
    let provider = ObservedProvider::new(
        Arc::new(FixedProvider),
        Arc::new(SafeProviderHooks::new(Panicking)),
    );
    let response = provider
        .complete(ModelRequest::new("m", vec![Message::new(Role::User, "hello")]))
        .await
        .expect("completion survives hook panics");
    assert_eq!(response.text(), "hi");

    let catalog = ToolCatalog::from_definitions([ToolDefinition {
        name: "echo".to_string(),
        description: "Echo".to_string(),
        input_schema: r#"{"type":"object"}"#.to_string(),
    }])
    .expect("catalog");
    let bridge = ToolBridge::new(
        Arc::new(catalog),
        Arc::new(FnToolExecutor::sync(|invocation| Ok(invocation.arguments))),
    )
    .with_hooks(Arc::new(SafeToolHooks::new(Panicking)));

    let result = bridge
        .dispatch(&sample_tool_call(), &sample_tool_context())
        .await
        .expect("dispatch survives hook panics");
    assert_eq!(result.output, "{}");
}

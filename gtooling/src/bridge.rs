//! Forwards model tool calls to the external executor.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use gprovider::{ToolCall, ToolDefinition};
//! use gtooling::{FnToolExecutor, ToolBridge, ToolCatalog, ToolExecutionContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let catalog = ToolCatalog::from_definitions([ToolDefinition {
//!     name: "echo".to_string(),
//!     description: "Echo arguments".to_string(),
//!     input_schema: r#"{"type":"object"}"#.to_string(),
//! }])
//! .expect("catalog");
//! let bridge = ToolBridge::new(
//!     Arc::new(catalog),
//!     Arc::new(FnToolExecutor::sync(|invocation| Ok(invocation.arguments))),
//! );
//!
//! let call = ToolCall {
//!     id: "call_1".to_string(),
//!     name: "echo".to_string(),
//!     arguments: "{}".to_string(),
//! };
//! let result = bridge
//!     .dispatch(&call, &ToolExecutionContext::new("req-1"))
//!     .await
//!     .expect("dispatch");
//! assert_eq!(result.output, "{}");
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::future::{Either, select};
use gprovider::{ToolCall, ToolDefinition};

use crate::{
    NoopToolBridgeHooks, ToolBridgeHooks, ToolCatalog, ToolError, ToolExecutionContext,
    ToolExecutionResult, ToolExecutor, ToolInvocation, UnconfiguredToolExecutor, check_required,
    parse_json_object,
};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ToolBridge {
    catalog: Arc<ToolCatalog>,
    executor: Arc<dyn ToolExecutor>,
    hooks: Arc<dyn ToolBridgeHooks>,
    timeout: Duration,
}

impl ToolBridge {
    pub fn new(catalog: Arc<ToolCatalog>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            catalog,
            executor,
            hooks: Arc::new(NoopToolBridgeHooks),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// A bridge that advertises schemas but has nowhere to run them.
    pub fn unconfigured(catalog: Arc<ToolCatalog>) -> Self {
        Self::new(catalog, Arc::new(UnconfiguredToolExecutor))
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolBridgeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.catalog.definitions()
    }

    pub fn has_tools(&self) -> bool {
        !self.catalog.is_empty()
    }

    pub async fn dispatch(
        &self,
        call: &ToolCall,
        context: &ToolExecutionContext,
    ) -> Result<ToolExecutionResult, ToolError> {
        self.hooks.on_dispatch_start(call, context);
        let started = Instant::now();

        let outcome = self
            .dispatch_inner(call, context)
            .await
            .map_err(|mut error| {
                error.tool_name.get_or_insert_with(|| call.name.clone());
                error.tool_call_id.get_or_insert_with(|| call.id.clone());
                error
            });

        let elapsed = started.elapsed();
        match &outcome {
            Ok(result) => self
                .hooks
                .on_dispatch_success(call, context, result, elapsed),
            Err(error) => self
                .hooks
                .on_dispatch_failure(call, context, error, elapsed),
        }

        outcome
    }

    async fn dispatch_inner(
        &self,
        call: &ToolCall,
        context: &ToolExecutionContext,
    ) -> Result<ToolExecutionResult, ToolError> {
        let schema = self.catalog.schema(&call.name).ok_or_else(|| {
            ToolError::not_found(format!("tool '{}' is not available", call.name))
        })?;

        let args = parse_json_object(&call.arguments)?;
        check_required(schema, &args)?;

        let invocation = ToolInvocation::from_call(call, context);
        let execution = self.executor.execute(invocation);
        let deadline = Delay::new(self.timeout);

        match select(execution, deadline).await {
            Either::Left((result, _)) => {
                result.map(|output| ToolExecutionResult::from_call(call, output))
            }
            Either::Right(_) => Err(ToolError::timeout(format!(
                "tool '{}' did not finish within {}s",
                call.name,
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{FnToolExecutor, ToolErrorKind};

    fn catalog() -> Arc<ToolCatalog> {
        Arc::new(
            ToolCatalog::from_definitions([ToolDefinition {
                name: "read_file".to_string(),
                description: "Read a project file".to_string(),
                input_schema: r#"{"type":"object","required":["path"]}"#.to_string(),
            }])
            .expect("catalog"),
        )
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl ToolBridgeHooks for RecordingHooks {
        fn on_dispatch_start(&self, tool_call: &ToolCall, _context: &ToolExecutionContext) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("start:{}", tool_call.name));
        }

        fn on_dispatch_success(
            &self,
            tool_call: &ToolCall,
            _context: &ToolExecutionContext,
            _result: &ToolExecutionResult,
            _elapsed: Duration,
        ) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("success:{}", tool_call.name));
        }

        fn on_dispatch_failure(
            &self,
            tool_call: &ToolCall,
            _context: &ToolExecutionContext,
            error: &ToolError,
            _elapsed: Duration,
        ) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("failure:{}:{:?}", tool_call.name, error.kind));
        }
    }

    #[tokio::test]
    async fn dispatch_forwards_name_arguments_and_request_id() {
        let bridge = ToolBridge::new(
            catalog(),
            Arc::new(FnToolExecutor::sync(|invocation| {
                Ok(format!(
                    "{}|{}|{}|{}",
                    invocation.name, invocation.arguments, invocation.call_id, invocation.request_id
                ))
            })),
        );

        let result = bridge
            .dispatch(
                &call("read_file", r#"{"path":"a.ts"}"#),
                &ToolExecutionContext::new("req-9"),
            )
            .await
            .expect("dispatch should succeed");

        assert_eq!(result.tool_call_id, "call_1");
        assert_eq!(result.output, r#"read_file|{"path":"a.ts"}|call_1|req-9"#);
    }

    #[tokio::test]
    async fn unknown_tools_and_bad_arguments_never_reach_the_executor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let bridge = ToolBridge::new(
            catalog(),
            Arc::new(FnToolExecutor::sync(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(String::new())
            })),
        );
        let context = ToolExecutionContext::new("req-1");

        let missing = bridge
            .dispatch(&call("delete_repo", "{}"), &context)
            .await
            .expect_err("unknown tool");
        assert_eq!(missing.kind, ToolErrorKind::NotFound);
        assert_eq!(missing.tool_name.as_deref(), Some("delete_repo"));

        let invalid = bridge
            .dispatch(&call("read_file", "{\"line\":1}"), &context)
            .await
            .expect_err("missing path");
        assert_eq!(invalid.kind, ToolErrorKind::InvalidArguments);

        let malformed = bridge
            .dispatch(&call("read_file", "{path"), &context)
            .await
            .expect_err("malformed json");
        assert_eq!(malformed.kind, ToolErrorKind::InvalidArguments);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_executors_time_out() {
        let bridge = ToolBridge::new(
            catalog(),
            Arc::new(FnToolExecutor::new(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("late".to_string())
            })),
        )
        .with_timeout(Duration::from_millis(20));

        let error = bridge
            .dispatch(
                &call("read_file", r#"{"path":"a.ts"}"#),
                &ToolExecutionContext::new("req-1"),
            )
            .await
            .expect_err("should time out");

        assert_eq!(error.kind, ToolErrorKind::Timeout);
        assert_eq!(error.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn unconfigured_bridge_reports_unavailable_and_hooks_observe_it() {
        let hooks = Arc::new(RecordingHooks::default());
        let bridge = ToolBridge::unconfigured(catalog()).with_hooks(hooks.clone());

        let error = bridge
            .dispatch(
                &call("read_file", r#"{"path":"a.ts"}"#),
                &ToolExecutionContext::new("req-1"),
            )
            .await
            .expect_err("no executor");

        assert_eq!(error.kind, ToolErrorKind::Unavailable);
        assert!(!error.is_recoverable());
        assert_eq!(
            hooks.events.lock().expect("events lock").as_slice(),
            &["start:read_file", "failure:read_file:Unavailable"]
        );
    }
}

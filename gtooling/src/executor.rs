//! The external tool-execution collaborator and its stock implementations.

use std::future::Future;
use std::sync::Arc;

use gcommon::BoxFuture;

use crate::{ToolError, ToolInvocation};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// Runs a tool call somewhere outside the gateway and returns its textual output.
pub trait ToolExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        invocation: ToolInvocation,
    ) -> ToolFuture<'a, Result<String, ToolError>>;
}

type ExecutorHandler =
    dyn Fn(ToolInvocation) -> ToolFuture<'static, Result<String, ToolError>> + Send + Sync;

/// Closure-backed executor for embedding and tests.
pub struct FnToolExecutor {
    handler: Arc<ExecutorHandler>,
}

impl FnToolExecutor {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(ToolInvocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        let handler: Arc<ExecutorHandler> = Arc::new(move |invocation| Box::pin(handler(invocation)));
        Self { handler }
    }

    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(ToolInvocation) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self::new(move |invocation| {
            let output = handler(invocation);
            async move { output }
        })
    }
}

impl ToolExecutor for FnToolExecutor {
    fn execute<'a>(
        &'a self,
        invocation: ToolInvocation,
    ) -> ToolFuture<'a, Result<String, ToolError>> {
        (self.handler)(invocation)
    }
}

/// Stands in when no executor is configured; every call is `Unavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredToolExecutor;

impl ToolExecutor for UnconfiguredToolExecutor {
    fn execute<'a>(
        &'a self,
        invocation: ToolInvocation,
    ) -> ToolFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            Err(ToolError::unavailable("no tool executor is configured")
                .with_tool_name(invocation.name)
                .with_tool_call_id(invocation.call_id))
        })
    }
}

#[cfg(feature = "http-executor")]
pub use http::HttpToolExecutor;

#[cfg(feature = "http-executor")]
mod http {
    use reqwest::{Client, StatusCode};
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    use super::{ToolExecutor, ToolFuture};
    use crate::{ToolError, ToolInvocation, parse_json_value};

    /// POSTs each invocation as JSON to a fixed endpoint.
    ///
    /// Request: `{"name","arguments","callId","requestId"}`.
    /// Response: `{"output": <string or JSON>}` or `{"error": "<message>"}`.
    #[derive(Debug, Clone)]
    pub struct HttpToolExecutor {
        client: Client,
        endpoint: String,
    }

    impl HttpToolExecutor {
        pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
            Self {
                client,
                endpoint: endpoint.into(),
            }
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct InvocationBody<'a> {
        name: &'a str,
        arguments: Value,
        call_id: &'a str,
        request_id: &'a str,
    }

    #[derive(Debug, Deserialize)]
    struct ExecutorReply {
        output: Option<Value>,
        error: Option<String>,
    }

    fn render_output(output: Value) -> String {
        match output {
            Value::String(text) => text,
            other => other.to_string(),
        }
    }

    fn status_error(status: StatusCode, message: String) -> ToolError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ToolError::unauthorized(message),
            StatusCode::NOT_FOUND => ToolError::not_found(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ToolError::invalid_arguments(message)
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ToolError::timeout(message),
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
                ToolError::unavailable(message)
            }
            _ => ToolError::execution(message),
        }
    }

    impl ToolExecutor for HttpToolExecutor {
        fn execute<'a>(
            &'a self,
            invocation: ToolInvocation,
        ) -> ToolFuture<'a, Result<String, ToolError>> {
            Box::pin(async move {
                let arguments = if invocation.arguments.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    parse_json_value(&invocation.arguments)?
                };
                let body = InvocationBody {
                    name: &invocation.name,
                    arguments,
                    call_id: &invocation.call_id,
                    request_id: invocation.request_id.as_str(),
                };

                let response = self
                    .client
                    .post(&self.endpoint)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|err| {
                        if err.is_timeout() {
                            ToolError::timeout(err.to_string())
                        } else {
                            ToolError::unavailable(format!("tool executor unreachable: {err}"))
                        }
                    })?;

                let status = response.status();
                let reply = response.json::<ExecutorReply>().await.ok();
                let error_message = reply.as_ref().and_then(|reply| reply.error.clone());

                if !status.is_success() {
                    let message = error_message
                        .unwrap_or_else(|| format!("tool executor returned status {status}"));
                    return Err(status_error(status, message));
                }

                match reply {
                    Some(ExecutorReply {
                        error: Some(message),
                        ..
                    }) => Err(ToolError::execution(message)),
                    Some(ExecutorReply {
                        output: Some(output),
                        ..
                    }) => Ok(render_output(output)),
                    Some(ExecutorReply { output: None, .. }) => Ok(String::new()),
                    None => Err(ToolError::execution(
                        "tool executor returned a malformed reply",
                    )),
                }
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use serde_json::json;

        use super::*;
        use crate::ToolErrorKind;

        #[test]
        fn outputs_render_as_text() {
            assert_eq!(render_output(json!("plain")), "plain");
            assert_eq!(render_output(json!({"lines": 3})), "{\"lines\":3}");
        }

        #[test]
        fn statuses_map_to_error_kinds() {
            assert_eq!(
                status_error(StatusCode::FORBIDDEN, "no".into()).kind,
                ToolErrorKind::Unauthorized
            );
            assert_eq!(
                status_error(StatusCode::SERVICE_UNAVAILABLE, "down".into()).kind,
                ToolErrorKind::Unavailable
            );
            assert_eq!(
                status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()).kind,
                ToolErrorKind::Execution
            );
        }

        #[test]
        fn invocation_body_uses_camel_case_keys() {
            let body = InvocationBody {
                name: "read_file",
                arguments: json!({"path": "a.ts"}),
                call_id: "call_1",
                request_id: "req-1",
            };

            let value = serde_json::to_value(&body).expect("serializable");
            assert_eq!(value["callId"], "call_1");
            assert_eq!(value["requestId"], "req-1");
            assert_eq!(value["arguments"]["path"], "a.ts");
        }
    }
}

//! Step-bounded generation loop with a live text stream and a structured event stream.
//!
//! One driver task per session feeds two bounded channels:
//! - text: assistant text chunks, then at most one terminal error;
//! - events: [`ChatEvent`]s for diagnostics, ending in `Error` or `Finished`.
//!
//! The event channel must be drained or dropped; an undrained event receiver
//! applies back-pressure to the driver like the text channel does.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use gcommon::RequestId;
use gprovider::{
    Message, ModelProvider, ModelRequest, Role, StopReason, StreamEvent, ToolCall, ToolChoice,
    ToolDefinition, ToolResult,
};
use gtooling::{ToolBridge, ToolExecutionContext};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::prompt::system_prompt;
use crate::{ChatError, ChatErrorKind, ChatEvent, ChatTurn, SessionSummary, StepResult};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct StreamOrchestrator {
    bridge: ToolBridge,
    channel_capacity: usize,
}

impl StreamOrchestrator {
    pub fn new(bridge: ToolBridge) -> Self {
        Self {
            bridge,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn bridge(&self) -> &ToolBridge {
        &self.bridge
    }

    /// Validates the turn and spawns its driver task on the current tokio runtime.
    pub fn start(
        &self,
        turn: ChatTurn,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<ChatSession, ChatError> {
        turn.validate()?;

        let (text_tx, text_rx) = mpsc::channel(self.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(self.channel_capacity);
        let token = CancellationToken::new();
        let request_id = turn.request_id.clone();

        let driver = Driver::new(
            turn,
            provider,
            self.bridge.clone(),
            text_tx,
            event_tx,
            token.clone(),
        );
        let handle = tokio::spawn(driver.run());
        let guard = Arc::new(DriverGuard {
            token: token.clone(),
            handle,
        });

        Ok(ChatSession {
            request_id,
            token,
            text: TextStream {
                inner: ReceiverStream::new(text_rx),
                _guard: guard.clone(),
            },
            events: EventStream {
                inner: ReceiverStream::new(event_rx),
                _guard: guard,
            },
        })
    }
}

impl std::fmt::Debug for StreamOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOrchestrator")
            .field("tools", &self.bridge.catalog().len())
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

/// Cancels and aborts the driver once every stream handle is gone.
struct DriverGuard {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Drop for DriverGuard {
    fn drop(&mut self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// A running chat session.
pub struct ChatSession {
    request_id: RequestId,
    token: CancellationToken,
    text: TextStream,
    events: EventStream,
}

impl ChatSession {
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Caller-facing text; the event stream is dropped.
    pub fn text(self) -> TextStream {
        self.text
    }

    /// Structured events only; the text stream is dropped, which stops the driver
    /// at its next text chunk.
    pub fn events(self) -> EventStream {
        self.events
    }

    pub fn into_parts(self) -> (TextStream, EventStream) {
        (self.text, self.events)
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("request_id", &self.request_id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

pub struct TextStream {
    inner: ReceiverStream<Result<String, ChatError>>,
    _guard: Arc<DriverGuard>,
}

impl Stream for TextStream {
    type Item = Result<String, ChatError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

pub struct EventStream {
    inner: ReceiverStream<ChatEvent>,
    _guard: Arc<DriverGuard>,
}

impl Stream for EventStream {
    type Item = ChatEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

struct StepOutput {
    text: String,
    tool_calls: Vec<ToolCall>,
    finish_reason: StopReason,
}

struct Driver {
    request_id: RequestId,
    model: String,
    history: Vec<Message>,
    tools: Vec<ToolDefinition>,
    tool_choice: ToolChoice,
    max_steps: u32,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    provider: Arc<dyn ModelProvider>,
    bridge: ToolBridge,
    text_tx: mpsc::Sender<Result<String, ChatError>>,
    event_tx: mpsc::Sender<ChatEvent>,
    token: CancellationToken,
}

impl Driver {
    fn new(
        turn: ChatTurn,
        provider: Arc<dyn ModelProvider>,
        bridge: ToolBridge,
        text_tx: mpsc::Sender<Result<String, ChatError>>,
        event_tx: mpsc::Sender<ChatEvent>,
        token: CancellationToken,
    ) -> Self {
        let mut history = vec![Message::new(Role::System, system_prompt(&turn))];
        history.extend(turn.conversation().iter().cloned());

        let offer_tools = turn.options.tool_choice != ToolChoice::None && bridge.has_tools();
        let (tools, tool_choice) = if offer_tools {
            (bridge.definitions(), turn.options.tool_choice)
        } else {
            (Vec::new(), ToolChoice::None)
        };

        Self {
            request_id: turn.request_id,
            model: turn.model,
            history,
            tools,
            tool_choice,
            max_steps: turn.options.max_steps,
            max_tokens: turn.options.max_tokens,
            temperature: turn.options.temperature,
            provider,
            bridge,
            text_tx,
            event_tx,
            token,
        }
    }

    async fn run(mut self) {
        tracing::debug!(
            request_id = %self.request_id,
            provider = self.provider.name(),
            model = %self.model,
            max_steps = self.max_steps,
            tools = self.tools.len(),
            "chat session started"
        );

        match self.run_steps().await {
            Ok(summary) => {
                tracing::info!(
                    request_id = %self.request_id,
                    steps = summary.steps,
                    provider_calls = summary.provider_calls,
                    step_limit_reached = summary.step_limit_reached,
                    finish_reason = summary.finish_reason.as_str(),
                    "chat session finished"
                );
                self.emit(ChatEvent::Finished(summary)).await;
            }
            Err(error) if error.kind == ChatErrorKind::Cancelled => {
                tracing::debug!(request_id = %self.request_id, "chat session cancelled");
                self.emit(ChatEvent::Error(error)).await;
            }
            Err(error) => {
                tracing::error!(
                    request_id = %self.request_id,
                    phase = error.phase.as_str(),
                    error = %error,
                    "chat session failed"
                );
                self.emit(ChatEvent::Error(error.clone())).await;
                let _ = self.text_tx.send(Err(error)).await;
            }
        }
    }

    async fn run_steps(&mut self) -> Result<SessionSummary, ChatError> {
        let mut summary = SessionSummary {
            steps: 0,
            provider_calls: 0,
            step_limit_reached: false,
            finish_reason: StopReason::Other,
            text_len: 0,
        };
        let context = ToolExecutionContext::new(self.request_id.clone())
            .with_metadata("model", self.model.clone());

        for step in 1..=self.max_steps {
            self.ensure_active()?;
            self.emit(ChatEvent::StepStarted { step }).await;

            summary.steps = step;
            summary.provider_calls += 1;
            let output = self.stream_step().await?;
            summary.text_len += output.text.len();
            summary.finish_reason = output.finish_reason;

            let mut result = StepResult {
                step_index: step,
                text: output.text,
                tool_calls: output.tool_calls,
                finish_reason: output.finish_reason,
                tool_errors: Vec::new(),
                pending_tool_calls: Vec::new(),
            };

            if result.tool_calls.is_empty() {
                self.finish_step(result).await;
                return Ok(summary);
            }

            if step == self.max_steps {
                result.pending_tool_calls = result.tool_calls.clone();
                summary.step_limit_reached = true;
                tracing::debug!(
                    request_id = %self.request_id,
                    pending = result.pending_tool_calls.len(),
                    "step budget exhausted with tool calls pending"
                );
                self.finish_step(result).await;
                return Ok(summary);
            }

            self.history.push(Message::assistant_with_tool_calls(
                result.text.clone(),
                result.tool_calls.clone(),
            ));

            for call in result.tool_calls.clone() {
                self.ensure_active()?;
                self.emit(ChatEvent::ToolCallRequested(call.clone())).await;

                let outcome = self
                    .bridge
                    .dispatch(&call, &context)
                    .await
                    .map(|executed| executed.output);
                let (output, fatal) = match &outcome {
                    Ok(output) => (output.clone(), None),
                    Err(error) => {
                        result.tool_errors.push(error.clone());
                        if error.is_recoverable() {
                            tracing::warn!(
                                request_id = %self.request_id,
                                step,
                                tool = %call.name,
                                error = %error,
                                "tool call failed, reporting to model"
                            );
                            (format!("error: {}", error.message), None)
                        } else {
                            (String::new(), Some(ChatError::from(error.clone())))
                        }
                    }
                };

                if let Some(fatal) = fatal {
                    self.emit(ChatEvent::ToolCallFinished { call, outcome }).await;
                    self.finish_step(result).await;
                    return Err(fatal);
                }

                self.history.push(Message::tool_result(ToolResult {
                    tool_call_id: call.id.clone(),
                    output,
                }));
                self.emit(ChatEvent::ToolCallFinished { call, outcome }).await;
            }

            self.finish_step(result).await;
        }

        Ok(summary)
    }

    /// One provider call, forwarding text as it arrives.
    async fn stream_step(&self) -> Result<StepOutput, ChatError> {
        let mut request = ModelRequest::new(self.model.clone(), self.history.clone())
            .with_tools(self.tools.clone(), self.tool_choice)
            .with_metadata("request_id", self.request_id.as_str())
            .enable_streaming();
        request.options.max_tokens = self.max_tokens;
        request.options.temperature = self.temperature;

        let mut events = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(cancelled()),
            _ = self.text_tx.closed() => return Err(caller_gone()),
            opened = self.provider.stream(request) => opened.map_err(ChatError::from)?,
        };

        let mut text = String::new();
        let mut calls = StepCalls::default();
        let mut finish_reason = StopReason::Other;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(cancelled()),
                _ = self.text_tx.closed() => return Err(caller_gone()),
                next = events.next() => next,
            };

            let Some(event) = next else {
                break;
            };

            match event.map_err(ChatError::from)? {
                StreamEvent::TextDelta(delta) => {
                    if delta.is_empty() {
                        continue;
                    }
                    text.push_str(&delta);
                    self.send_text(delta).await?;
                }
                StreamEvent::ToolCallDelta(call) => calls.delta(call),
                StreamEvent::MessageComplete(message) => {
                    if text.is_empty() && !message.content.is_empty() {
                        text.push_str(&message.content);
                        self.send_text(message.content).await?;
                    }
                    calls.complete(message.tool_calls);
                }
                StreamEvent::ResponseComplete(response) => {
                    finish_reason = response.stop_reason;
                    let response_text = response.text();
                    if text.is_empty() && !response_text.is_empty() {
                        text.push_str(&response_text);
                        self.send_text(response_text).await?;
                    }
                    if !calls.has_completed_calls() {
                        calls.complete(response.tool_calls());
                    }
                }
            }
        }

        let tool_calls = calls.into_calls();
        if !tool_calls.is_empty() && finish_reason != StopReason::MaxTokens {
            finish_reason = StopReason::ToolUse;
        }

        Ok(StepOutput {
            text,
            tool_calls,
            finish_reason,
        })
    }

    async fn send_text(&self, chunk: String) -> Result<(), ChatError> {
        self.emit(ChatEvent::TextDelta(chunk.clone())).await;
        self.text_tx.send(Ok(chunk)).await.map_err(|_| caller_gone())
    }

    async fn finish_step(&self, result: StepResult) {
        tracing::debug!(
            request_id = %self.request_id,
            step = result.step_index,
            finish_reason = result.finish_reason.as_str(),
            tools = ?result.tool_names(),
            tool_errors = result.tool_errors.len(),
            "step finished"
        );
        self.emit(ChatEvent::StepFinished(result)).await;
    }

    /// Event delivery is best effort; a dropped event receiver is not an error.
    async fn emit(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event).await;
    }

    fn ensure_active(&self) -> Result<(), ChatError> {
        if self.token.is_cancelled() {
            return Err(cancelled());
        }
        if self.text_tx.is_closed() {
            return Err(caller_gone());
        }
        Ok(())
    }
}

fn cancelled() -> ChatError {
    ChatError::cancelled("chat session was cancelled")
}

fn caller_gone() -> ChatError {
    ChatError::cancelled("caller closed the text stream")
}

/// Tool calls of one step. The assembled list from the completion events wins
/// over per-delta state, whose ids may still be placeholders.
#[derive(Default)]
struct StepCalls {
    streamed: Vec<ToolCall>,
    completed: Option<Vec<ToolCall>>,
}

impl StepCalls {
    fn delta(&mut self, call: ToolCall) {
        upsert_call(&mut self.streamed, call);
    }

    fn complete(&mut self, calls: Vec<ToolCall>) {
        self.completed = Some(calls);
    }

    fn has_completed_calls(&self) -> bool {
        self.completed.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    fn into_calls(self) -> Vec<ToolCall> {
        match self.completed {
            Some(calls) if !calls.is_empty() => calls,
            _ => self.streamed,
        }
    }
}

fn upsert_call(calls: &mut Vec<ToolCall>, call: ToolCall) {
    match calls.iter_mut().find(|existing| existing.id == call.id) {
        Some(existing) => *existing = call,
        None => calls.push(call),
    }
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{StreamExt, stream};
use gchat::{ChatEvent, EventStream, TextStream};
use gprovider::{
    BoxedEventStream, Message, ModelProvider, ModelRequest, ModelResponse, OutputItem,
    ProviderError, ProviderFuture, Role, StopReason, StreamEvent, TokenUsage, ToolCall,
    ToolDefinition, VecEventStream,
};
use gtooling::{FnToolExecutor, ToolBridge, ToolCatalog, ToolError};

pub enum Script {
    Events(Vec<Result<StreamEvent, ProviderError>>),
    /// Emits the events, then never finishes.
    Hang(Vec<Result<StreamEvent, ProviderError>>),
    OpenError(ProviderError),
}

#[derive(Default)]
pub struct ScriptedProvider {
    streams: Mutex<VecDeque<Script>>,
    completions: Mutex<VecDeque<Result<ModelResponse, ProviderError>>>,
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(self, script: Script) -> Self {
        self.streams.lock().expect("streams lock").push_back(script);
        self
    }

    pub fn with_completion(self, completion: Result<ModelResponse, ProviderError>) -> Self {
        self.completions
            .lock()
            .expect("completions lock")
            .push_back(completion);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn request(&self, index: usize) -> ModelRequest {
        self.requests.lock().expect("requests lock")[index].clone()
    }
}

impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            self.requests.lock().expect("requests lock").push(request);
            self.completions
                .lock()
                .expect("completions lock")
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::other("no scripted completion left")))
        })
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.requests.lock().expect("requests lock").push(request);
            let script = self
                .streams
                .lock()
                .expect("streams lock")
                .pop_front()
                .unwrap_or_else(|| Script::Events(text_step("done")));

            match script {
                Script::Events(events) => Ok(Box::pin(VecEventStream::new(events)) as BoxedEventStream<'a>),
                Script::Hang(events) => {
                    let hanging = stream::iter(events).chain(stream::pending());
                    Ok(Box::pin(hanging) as BoxedEventStream<'a>)
                }
                Script::OpenError(error) => Err(error),
            }
        })
    }
}

pub fn response(output: Vec<OutputItem>, stop_reason: StopReason) -> ModelResponse {
    ModelResponse {
        provider: "Scripted".to_string(),
        model: "scripted-model".to_string(),
        output,
        stop_reason,
        usage: TokenUsage::default(),
    }
}

pub fn reply(text: &str) -> ModelResponse {
    response(
        vec![OutputItem::Message(Message::new(Role::Assistant, text))],
        StopReason::EndTurn,
    )
}

pub fn text_step(text: &str) -> Vec<Result<StreamEvent, ProviderError>> {
    vec![
        Ok(StreamEvent::TextDelta(text.to_string())),
        Ok(StreamEvent::ResponseComplete(reply(text))),
    ]
}

pub fn read_call(id: &str, path: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: "read_file".to_string(),
        arguments: format!("{{\"path\":\"{path}\"}}"),
    }
}

pub fn tool_step(call: ToolCall) -> Vec<Result<StreamEvent, ProviderError>> {
    vec![
        Ok(StreamEvent::TextDelta("Let me look. ".to_string())),
        Ok(StreamEvent::ToolCallDelta(call.clone())),
        Ok(StreamEvent::ResponseComplete(response(
            vec![
                OutputItem::Message(Message::new(Role::Assistant, "Let me look. ")),
                OutputItem::ToolCall(call),
            ],
            StopReason::ToolUse,
        ))),
    ]
}

pub fn catalog() -> Arc<ToolCatalog> {
    let catalog = ToolCatalog::from_definitions([ToolDefinition {
        name: "read_file".to_string(),
        description: "Read a project file".to_string(),
        input_schema:
            r#"{"type":"object","properties":{"path":{"type":"string"}},"required":["path"]}"#
                .to_string(),
    }])
    .expect("catalog");
    Arc::new(catalog)
}

/// A bridge whose executor counts calls and answers with `result`.
pub fn counting_bridge(
    result: Result<String, ToolError>,
) -> (ToolBridge, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let executor = FnToolExecutor::sync(move |_invocation| {
        counter.fetch_add(1, Ordering::SeqCst);
        result.clone()
    });

    (ToolBridge::new(catalog(), Arc::new(executor)), calls)
}

/// Drains both streams to completion.
pub async fn drain(
    mut text: TextStream,
    mut events: EventStream,
) -> (Vec<Result<String, gchat::ChatError>>, Vec<ChatEvent>) {
    let collect_events = async move {
        let mut collected = Vec::new();
        while let Some(event) = events.next().await {
            collected.push(event);
        }
        collected
    };
    let collect_text = async move {
        let mut collected = Vec::new();
        while let Some(chunk) = text.next().await {
            collected.push(chunk);
        }
        collected
    };

    futures_util::future::join(collect_text, collect_events).await
}

//! `POST /chat`: resolve a provider, optionally optimize context, then stream.
//!
//! The first text chunk is awaited before the response is committed, so a
//! failure that happens before any output becomes a plain HTTP error. Later
//! failures end the body with an error frame after the text already sent.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use gchat::{
    ChatErrorKind, ChatEvent, ChatMode, ChatTurn, Directives, EventStream, PromptVariant,
    StreamingOptions,
};
use gcommon::RequestId;
use gprovider::ToolChoice;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cookies::UserCredentials;
use super::dto::ChatRequest;
use super::error::{ApiError, error_frame};
use crate::config::GatewayConfig;
use crate::state::AppState;

pub(super) async fn handle_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let credentials = UserCredentials::from_headers(&headers);
    let gateway = &state.config().gateway;

    let mut messages = request.to_messages()?;
    let directives = Directives::apply(&mut messages);
    let mode = ChatMode::normalize(request.chat_mode.as_deref());
    let max_steps = resolve_max_steps(request.max_llm_steps, gateway)?;

    let registry = state.registry()?;
    let provider_name = directives
        .provider
        .as_deref()
        .unwrap_or(gateway.default_provider.as_str());
    let instance = registry.get_provider(provider_name)?;
    let model = directives
        .model
        .or_else(|| gateway.default_model.clone())
        .unwrap_or_else(|| instance.default_model().to_string());

    let tool_choice = if instance.supports_tools() {
        state.tool_choice()
    } else {
        ToolChoice::None
    };
    let mut turn = ChatTurn::new(model, messages)
        .with_mode(mode)
        .with_prompt(PromptVariant::from_id(request.prompt_id.as_deref()))
        .with_files(request.file_map())
        .with_options(
            StreamingOptions::default()
                .with_max_steps(max_steps)
                .with_tool_choice(tool_choice),
        );
    if let Some(scheme) = request.design_scheme.clone() {
        turn = turn.with_design_scheme(scheme.into());
    }
    if let Some(supabase) = request.supabase.clone() {
        turn = turn.with_supabase(supabase.into());
    }
    turn.validate()?;

    let provider = state.observe(instance.open(&credentials.overrides, &credentials.settings)?);

    if request.context_optimization && !turn.files.is_empty() {
        let outcome = state
            .optimizer()
            .optimize(provider.as_ref(), &turn.model, &turn.messages, &turn.files)
            .await;
        turn = turn.with_optimization(outcome);
    }

    info!(
        request_id = %turn.request_id,
        provider = instance.name(),
        model = %turn.model,
        mode = mode.as_str(),
        max_steps,
        files = turn.files.len(),
        context_files = turn.prompt_files().len(),
        summarized = turn.summary.is_some(),
        "chat session starting"
    );

    let session = state.orchestrator().start(turn, provider)?;
    let request_id = session.request_id().clone();
    let token = session.cancellation_token();
    let (mut text, events) = session.into_parts();
    let tasks = RequestTasks {
        token,
        watcher: Some(tokio::spawn(watch_events(request_id, events))),
    };

    let first = match text.next().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(error)) => return Err(ApiError::from(error)),
        None => None,
    };

    let body = async_stream::stream! {
        if let Some(chunk) = first {
            yield Ok::<Bytes, Infallible>(Bytes::from(chunk));
        }
        while let Some(item) = text.next().await {
            match item {
                Ok(chunk) => yield Ok(Bytes::from(chunk)),
                Err(error) => {
                    yield Ok(error_frame(&error));
                    break;
                }
            }
        }
        drop(text);
        tasks.join().await;
    };

    let headers = [
        (header::CONTENT_TYPE, "text/event-stream"),
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
    ];
    Ok((headers, Body::from_stream(body)).into_response())
}

/// Omitted means the configured default; larger values are clamped.
fn resolve_max_steps(requested: Option<i64>, gateway: &GatewayConfig) -> Result<u32, ApiError> {
    match requested {
        None => Ok(gateway.default_max_steps),
        Some(steps) if steps <= 0 => Err(ApiError::bad_request(
            "maxLLMSteps must be a positive integer",
        )),
        Some(steps) => Ok(u32::try_from(steps)
            .unwrap_or(u32::MAX)
            .min(gateway.max_steps_limit)),
    }
}

/// Per-request background work, bound to the response body.
///
/// Dropping it before [`RequestTasks::join`] (client disconnect, early error)
/// cancels the session and aborts the watcher.
struct RequestTasks {
    token: CancellationToken,
    watcher: Option<JoinHandle<()>>,
}

impl RequestTasks {
    async fn join(mut self) {
        if let Some(watcher) = self.watcher.take()
            && let Err(err) = watcher.await
            && err.is_panic()
        {
            error!("chat event watcher panicked");
        }
    }
}

impl Drop for RequestTasks {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            self.token.cancel();
            watcher.abort();
        }
    }
}

/// Drains the structured events so terminal errors are logged even when the
/// text consumer never sees them.
async fn watch_events(request_id: RequestId, mut events: EventStream) {
    while let Some(event) = events.next().await {
        match event {
            ChatEvent::StepFinished(step) => {
                debug!(
                    request_id = %request_id,
                    step = step.step_index,
                    finish_reason = step.finish_reason.as_str(),
                    tools = ?step.tool_names(),
                    pending = step.pending_tool_calls.len(),
                    "step finished"
                );
                for failure in &step.tool_errors {
                    warn!(
                        request_id = %request_id,
                        step = step.step_index,
                        tool = failure.tool_name.as_deref().unwrap_or_default(),
                        error = %failure,
                        "tool call failed"
                    );
                }
            }
            ChatEvent::Error(failure) if failure.kind == ChatErrorKind::Cancelled => {
                debug!(request_id = %request_id, "chat session cancelled");
            }
            ChatEvent::Error(failure) => {
                error!(
                    request_id = %request_id,
                    kind = ?failure.kind,
                    phase = failure.phase.as_str(),
                    error = %failure.message,
                    "chat session failed"
                );
            }
            ChatEvent::Finished(summary) => {
                debug!(
                    request_id = %request_id,
                    steps = summary.steps,
                    provider_calls = summary.provider_calls,
                    step_limit_reached = summary.step_limit_reached,
                    "chat session finished"
                );
            }
            _ => {}
        }
    }
}

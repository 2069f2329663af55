#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use futures_util::{StreamExt, stream};
use gatehouse::{AppState, GatehouseConfig, router};
use gprovider::{
    BoxedEventStream, EnvSnapshot, Message, ModelProvider, ModelRequest, ModelResponse,
    OutputItem, ProviderBinding, ProviderError, ProviderFactory, ProviderFuture, Role, StopReason,
    StreamEvent, TokenUsage, VecEventStream,
};
use gtooling::UnconfiguredToolExecutor;

pub enum Script {
    Events(Vec<Result<StreamEvent, ProviderError>>),
    /// Emits the events, then never finishes.
    Hang(Vec<Result<StreamEvent, ProviderError>>),
    OpenError(ProviderError),
}

/// What a provider opened by [`ScriptedFactory`] was bound to.
#[derive(Debug, Clone)]
pub struct OpenedBinding {
    pub provider: String,
    pub base_url: String,
    pub credential: Option<String>,
}

#[derive(Default)]
struct Shared {
    streams: Mutex<VecDeque<Script>>,
    completions: Mutex<VecDeque<Result<ModelResponse, ProviderError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    bindings: Mutex<Vec<OpenedBinding>>,
}

/// Builds providers that replay queued scripts, whichever provider is opened.
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    shared: Arc<Shared>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(self, script: Script) -> Self {
        self.shared
            .streams
            .lock()
            .expect("streams lock")
            .push_back(script);
        self
    }

    pub fn with_completion(self, completion: Result<ModelResponse, ProviderError>) -> Self {
        self.shared
            .completions
            .lock()
            .expect("completions lock")
            .push_back(completion);
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.shared.requests.lock().expect("requests lock").clone()
    }

    pub fn bindings(&self) -> Vec<OpenedBinding> {
        self.shared.bindings.lock().expect("bindings lock").clone()
    }
}

impl ProviderFactory for ScriptedFactory {
    fn build(&self, binding: ProviderBinding) -> Result<Arc<dyn ModelProvider>, ProviderError> {
        self.shared
            .bindings
            .lock()
            .expect("bindings lock")
            .push(OpenedBinding {
                provider: binding.config.name().to_string(),
                base_url: binding.base_url.clone(),
                credential: binding
                    .credential
                    .as_ref()
                    .map(|secret| secret.expose().to_string()),
            });

        Ok(Arc::new(ScriptedProvider {
            name: binding.config.name().to_string(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct ScriptedProvider {
    name: String,
    shared: Arc<Shared>,
}

impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            self.shared
                .requests
                .lock()
                .expect("requests lock")
                .push(request);
            self.shared
                .completions
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
            self.shared
                .requests
                .lock()
                .expect("requests lock")
                .push(request);
            let script = self
                .shared
                .streams
                .lock()
                .expect("streams lock")
                .pop_front()
                .unwrap_or_else(|| Script::Events(text_step("done")));

            match script {
                Script::Events(events) => {
                    Ok(Box::pin(VecEventStream::new(events)) as BoxedEventStream<'a>)
                }
                Script::Hang(events) => {
                    let hanging = stream::iter(events).chain(stream::pending());
                    Ok(Box::pin(hanging) as BoxedEventStream<'a>)
                }
                Script::OpenError(error) => Err(error),
            }
        })
    }
}

pub fn reply(text: &str) -> ModelResponse {
    ModelResponse {
        provider: "Scripted".to_string(),
        model: "scripted-model".to_string(),
        output: vec![OutputItem::Message(Message::new(Role::Assistant, text))],
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage::default(),
    }
}

pub fn text_step(text: &str) -> Vec<Result<StreamEvent, ProviderError>> {
    vec![
        Ok(StreamEvent::TextDelta(text.to_string())),
        Ok(StreamEvent::ResponseComplete(reply(text))),
    ]
}

/// State over an empty process layer and the given platform variables.
pub fn test_state(
    config: GatehouseConfig,
    platform_env: &[(&str, &str)],
    factory: &ScriptedFactory,
) -> Arc<AppState> {
    let env = EnvSnapshot::new(
        Vec::<(String, String)>::new(),
        platform_env.iter().copied(),
        Vec::<(String, String)>::new(),
    );
    let state = AppState::new(
        config,
        env,
        Arc::new(factory.clone()),
        Arc::new(UnconfiguredToolExecutor),
    )
    .expect("state");
    Arc::new(state)
}

pub fn default_app(platform_env: &[(&str, &str)], factory: &ScriptedFactory) -> Router {
    router(test_state(
        GatehouseConfig::default(),
        platform_env,
        factory,
    ))
}

/// Percent-encodes like `encodeURIComponent`.
pub fn encode_cookie(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

pub fn api_keys_cookie(keys: serde_json::Value) -> String {
    format!("apiKeys={}", encode_cookie(&keys.to_string()))
}

pub fn post_chat(body: serde_json::Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).expect("json body")
}

pub fn user_chat(text: &str) -> serde_json::Value {
    serde_json::json!({
        "messages": [{ "role": "user", "content": text }]
    })
}

//! Generic provider over any chat-completions compatible backend.

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::Client;

use crate::{
    BoxedEventStream, ModelProvider, ModelRequest, ModelResponse, ProviderBinding, ProviderError,
    ProviderFactory, ProviderFuture, SecretString, ToolChoice,
};

use super::transport::{OpenAiHttpTransport, OpenAiTransport};
use super::types::{OpenAiAuth, OpenAiMessage, OpenAiRequest, OpenAiTool};

#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    name: String,
    supports_tools: bool,
    auth: OpenAiAuth,
    transport: Arc<dyn OpenAiTransport>,
    fallback_model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        credential: Option<SecretString>,
        transport: Arc<dyn OpenAiTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            supports_tools: true,
            auth: credential.map_or(OpenAiAuth::Anonymous, OpenAiAuth::Bearer),
            transport,
            fallback_model: String::new(),
        }
    }

    pub fn with_tool_support(mut self, supports_tools: bool) -> Self {
        self.supports_tools = supports_tools;
        self
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub(crate) fn build_openai_request(&self, request: ModelRequest, stream: bool) -> OpenAiRequest {
        let model = if request.model.trim().is_empty() {
            self.fallback_model.clone()
        } else {
            request.model
        };

        let offer_tools = self.supports_tools && request.tool_choice != ToolChoice::None;
        let tools = if offer_tools {
            request.tools.into_iter().map(OpenAiTool::from).collect()
        } else {
            Vec::new()
        };
        let tool_choice = (!tools.is_empty()).then_some(request.tool_choice);

        OpenAiRequest {
            model,
            messages: request
                .messages
                .into_iter()
                .map(OpenAiMessage::from)
                .collect(),
            tools,
            tool_choice,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream,
        }
    }

    fn prepare(&self, mut request: ModelRequest) -> Result<ModelRequest, ProviderError> {
        if request.model.trim().is_empty() {
            request.model = self.fallback_model.clone();
        }
        if !self.supports_tools && request.tool_choice == ToolChoice::Required {
            request.tool_choice = ToolChoice::Auto;
        }

        request.validate()?;
        Ok(request)
    }
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("name", &self.name)
            .field("supports_tools", &self.supports_tools)
            .field("auth", &self.auth)
            .field("transport", &self.transport)
            .finish()
    }
}

impl ModelProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            let request = self.prepare(request)?;
            let openai_request = self.build_openai_request(request, false);
            let response = self
                .transport
                .complete(openai_request, self.auth.clone())
                .await?;
            Ok(response.into_model_response(&self.name))
        })
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let request = self.prepare(request)?;
            let openai_request = self.build_openai_request(request, true);
            let mut chunks = self
                .transport
                .stream(openai_request, self.auth.clone())
                .await?;
            let name = self.name.as_str();

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    yield chunk?.into_stream_event(name);
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}

/// Builds [`OpenAiCompatibleProvider`]s that share one HTTP client.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleFactory {
    client: Client,
    request_timeout: Option<Duration>,
}

impl OpenAiCompatibleFactory {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            request_timeout: None,
        }
    }

    /// Client whose connect and idle-read timeouts are `timeout`.
    ///
    /// A stream stays open as long as chunks keep arriving within `timeout`
    /// of each other. Non-streaming completions also get `timeout` as a
    /// total deadline.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|err| ProviderError::other(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            request_timeout: Some(timeout),
        })
    }
}

impl ProviderFactory for OpenAiCompatibleFactory {
    fn build(&self, binding: ProviderBinding) -> Result<Arc<dyn ModelProvider>, ProviderError> {
        let mut transport = OpenAiHttpTransport::new(self.client.clone(), binding.base_url);
        if let Some(timeout) = self.request_timeout {
            transport = transport.with_request_timeout(timeout);
        }
        let provider =
            OpenAiCompatibleProvider::new(binding.config.name(), binding.credential, Arc::new(transport))
                .with_tool_support(binding.config.supports_tools())
                .with_fallback_model(binding.config.default_model());

        Ok(Arc::new(provider))
    }
}

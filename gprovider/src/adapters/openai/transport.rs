//! Chat-completions transport trait and reqwest-based HTTP implementation.

use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::{ProviderError, ProviderFuture};

use super::serde_api::{OpenAiApiResponse, build_api_request, extract_error_message};
use super::sse::{SseDecoder, SsePayload, StreamAccumulator};
use super::types::{OpenAiAuth, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk};

pub type OpenAiChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<OpenAiStreamChunk, ProviderError>> + Send + 'a>>;

pub trait OpenAiTransport: Send + Sync + std::fmt::Debug {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    client: Client,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl OpenAiHttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            request_timeout: None,
        }
    }

    /// Total deadline for non-streaming completions. Streams are bounded only
    /// by the client's connect and idle timeouts.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn apply_auth(builder: RequestBuilder, auth: &OpenAiAuth) -> RequestBuilder {
        match auth {
            OpenAiAuth::Bearer(key) => builder.bearer_auth(key.expose()),
            OpenAiAuth::Anonymous => builder,
        }
    }

    async fn send(
        &self,
        request: OpenAiRequest,
        auth: &OpenAiAuth,
        deadline: Option<Duration>,
    ) -> Result<Response, ProviderError> {
        let api_request = build_api_request(request)?;
        let mut builder = self
            .client
            .post(self.endpoint("chat/completions"))
            .json(&api_request);
        if let Some(deadline) = deadline {
            builder = builder.timeout(deadline);
        }
        let response = Self::apply_auth(builder, auth)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        Ok(response)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("chat completion request failed with status {status}"));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::authentication(message)
            }
            StatusCode::NOT_FOUND => ProviderError::not_found(message),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ProviderError::timeout(message)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ProviderError::invalid_request(message)
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                ProviderError::unavailable(message)
            }
            _ => ProviderError::transport(message),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(err.to_string())
    } else if err.is_connect() {
        ProviderError::unavailable(err.to_string())
    } else {
        ProviderError::transport(err.to_string())
    }
}

impl OpenAiTransport for OpenAiHttpTransport {
    fn complete<'a>(
        &'a self,
        mut request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            request.stream = false;
            let model = request.model.clone();
            let response = self.send(request, &auth, self.request_timeout).await?;
            let parsed: OpenAiApiResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::transport(err.to_string()))?;

            OpenAiResponse::from_api(parsed, &model)
        })
    }

    fn stream<'a>(
        &'a self,
        mut request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.stream = true;
            let mut accumulator = StreamAccumulator::new(request.model.clone());
            let response = self.send(request, &auth, None).await?;

            let stream = try_stream! {
                let mut bytes = response.bytes_stream();
                let mut decoder = SseDecoder::default();

                'read: while let Some(item) = bytes.next().await {
                    let item = item.map_err(map_reqwest_error)?;
                    for payload in decoder.push(&item)? {
                        match payload {
                            SsePayload::Done => break 'read,
                            SsePayload::Data(data) => {
                                for chunk in accumulator.apply(&data)? {
                                    yield chunk;
                                }
                            }
                        }
                    }
                }

                for chunk in accumulator.finish() {
                    yield chunk;
                }
            };

            Ok(Box::pin(stream) as OpenAiChunkStream<'a>)
        })
    }
}

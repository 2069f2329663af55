//! Operational hooks around provider calls.
//!
//! Providers are never retried; hooks observe exactly one attempt per call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    BoxedEventStream, ModelProvider, ModelRequest, ModelResponse, ProviderError, ProviderFuture,
};

pub trait ProviderOperationHooks: Send + Sync {
    fn on_call_start(&self, _provider: &str, _operation: &str, _model: &str) {}

    fn on_success(&self, _provider: &str, _operation: &str, _elapsed: Duration) {}

    fn on_failure(
        &self,
        _provider: &str,
        _operation: &str,
        _elapsed: Duration,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

/// Wraps a provider and reports every `complete` / `stream` call to hooks.
///
/// For `stream`, success means the stream was opened.
pub struct ObservedProvider {
    inner: Arc<dyn ModelProvider>,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl ObservedProvider {
    pub fn new(inner: Arc<dyn ModelProvider>, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        Self { inner, hooks }
    }

    fn report<T>(&self, operation: &str, started: Instant, result: &Result<T, ProviderError>) {
        let elapsed = started.elapsed();
        match result {
            Ok(_) => self.hooks.on_success(self.inner.name(), operation, elapsed),
            Err(error) => self
                .hooks
                .on_failure(self.inner.name(), operation, elapsed, error),
        }
    }
}

impl ModelProvider for ObservedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            self.hooks
                .on_call_start(self.inner.name(), "complete", &request.model);
            let started = Instant::now();
            let result = self.inner.complete(request).await;
            self.report("complete", started, &result);
            result
        })
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.hooks
                .on_call_start(self.inner.name(), "stream", &request.model);
            let started = Instant::now();
            let result = self.inner.stream(request).await;
            self.report("stream", started, &result);
            result
        })
    }
}

use std::future::Future;
use std::pin::Pin;

use crate::{BoxedEventStream, ModelRequest, ModelResponse, ProviderError};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An opened backend: credentials and base URL are already bound.
pub trait ModelProvider: Send + Sync {
    /// Registry name of the provider this backend was opened from.
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>>;
}

//! Provider abstractions for the gatehouse gateway.
//!
//! The crate covers:
//! - the provider-agnostic request/response/stream model,
//! - the [`ProviderConfig`] catalog and layered [`EnvSnapshot`],
//! - credential resolution and the snapshot-keyed [`ProviderRegistry`] / [`RegistryCache`],
//! - one OpenAI-compatible HTTP adapter used by every catalog entry (feature `http-adapter`).

mod adapters;
mod config;
mod credentials;
mod env;
mod error;
mod hooks;
mod model;
mod provider;
mod registry;
mod stream;

pub mod prelude;

#[cfg(feature = "http-adapter")]
pub use adapters::openai;
#[cfg(feature = "http-adapter")]
pub use adapters::openai::{OpenAiCompatibleFactory, OpenAiCompatibleProvider};
pub use config::{
    ANTHROPIC_BASE_URL, AuthStyle, LMSTUDIO_BASE_URL, OLLAMA_BASE_URL, OPENAI_BASE_URL,
    ProviderConfig, builtin_providers,
};
pub use credentials::{
    CredentialOverrides, CredentialSource, ProviderSettings, ProviderSettingsMap,
    ResolvedCredential, SecretString,
};
pub use env::{EnvFingerprint, EnvLayer, EnvSnapshot, embedded_env};
pub use error::{ProviderError, ProviderErrorKind};
pub use hooks::{NoopOperationHooks, ObservedProvider, ProviderOperationHooks};
pub use model::{
    Message, ModelRequest, ModelRequestBuilder, ModelResponse, OutputItem, Role, StopReason,
    TokenUsage, ToolCall, ToolChoice, ToolDefinition, ToolResult,
};
pub use provider::{ModelProvider, ProviderFuture};
pub use registry::{
    DEFAULT_CACHE_CAPACITY, ProviderBinding, ProviderFactory, ProviderInstance, ProviderRegistry,
    RegistryCache,
};
pub use stream::{BoxedEventStream, ModelEventStream, StreamEvent, VecEventStream};
pub use gcommon::{BoxFuture, MetadataMap};

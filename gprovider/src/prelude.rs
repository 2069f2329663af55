//! Common `gprovider` imports for downstream crates.

pub use crate::{
    AuthStyle, BoxedEventStream, CredentialOverrides, CredentialSource, EnvSnapshot, Message,
    ModelEventStream, ModelProvider, ModelRequest, ModelRequestBuilder, ModelResponse,
    NoopOperationHooks, ObservedProvider, OutputItem, ProviderConfig, ProviderError,
    ProviderErrorKind, ProviderFactory, ProviderInstance, ProviderOperationHooks,
    ProviderRegistry, ProviderSettings, ProviderSettingsMap, RegistryCache, Role, StopReason,
    StreamEvent, TokenUsage, ToolCall, ToolChoice, ToolDefinition, ToolResult,
};
pub use gcommon::{BoxFuture, MetadataMap};

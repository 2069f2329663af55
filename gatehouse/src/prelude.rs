//! Common imports for embedding the gateway.

pub use crate::{
    AppState, ChatError, ChatErrorKind, ChatEvent, ChatMode, ChatTurn, ConfigError,
    ContextOptimizer, CredentialOverrides, EnvSnapshot, FileMap, GatehouseConfig, Message,
    ModelProvider, ModelRequest, ProviderError, ProviderFactory, RegistryCache, Role,
    StreamOrchestrator, StreamingOptions, ToolBridge, ToolCatalog, ToolChoice, router, serve,
};

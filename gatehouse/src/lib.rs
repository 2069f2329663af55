//! Facade over the gatehouse workspace crates plus the HTTP gateway service.
//!
//! Applications embedding the pipeline depend on this crate alone: it
//! re-exports the provider, tooling, chat, and observability crates, and adds
//! TOML [`config`], shared [`state`], and the axum [`server`].

pub mod config;
pub mod prelude;
pub mod server;
pub mod state;

pub use gchat;
pub use gcommon;
pub use gobserve;
pub use gprovider;
pub use gtooling;

pub use config::{ConfigError, GatehouseConfig};
pub use gchat::{
    ChatError, ChatErrorKind, ChatEvent, ChatMode, ChatSession, ChatTurn, ContextOptimizer,
    FileMap, OptimizationOutcome, StepResult, StreamOrchestrator, StreamingOptions,
};
pub use gcommon::{BoxFuture, MetadataMap, RequestId};
pub use gprovider::{
    CredentialOverrides, EnvSnapshot, Message, ModelProvider, ModelRequest, ProviderConfig,
    ProviderError, ProviderErrorKind, ProviderFactory, ProviderRegistry, RegistryCache, Role,
    StreamEvent, ToolCall, ToolChoice, ToolDefinition,
};
pub use gtooling::{ToolBridge, ToolCatalog, ToolError, ToolErrorKind, ToolExecutor};
pub use server::{ApiError, router, serve};
pub use state::AppState;

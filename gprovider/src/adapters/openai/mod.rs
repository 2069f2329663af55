//! OpenAI-compatible chat-completions adapter shared by every catalog provider.

mod provider;
mod serde_api;
mod sse;
mod transport;
mod types;

pub use provider::{OpenAiCompatibleFactory, OpenAiCompatibleProvider};
pub use transport::{OpenAiChunkStream, OpenAiHttpTransport, OpenAiTransport};
pub use types::{
    OpenAiAssistantMessage, OpenAiAuth, OpenAiFinishReason, OpenAiMessage, OpenAiRequest,
    OpenAiResponse, OpenAiRole, OpenAiStreamChunk, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};

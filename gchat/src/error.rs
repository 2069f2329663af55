//! Chat-layer errors, their phase, and the public text callers may see.

use std::error::Error;
use std::fmt::{Display, Formatter};

use gprovider::{ProviderError, ProviderErrorKind};
use gtooling::ToolError;

pub const PUBLIC_AUTH_MESSAGE: &str = "Invalid or missing API key";
pub const PUBLIC_GENERIC_MESSAGE: &str = "An error occurred.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Configuration,
    Provider,
    ContextOptimization,
    Tooling,
    Transport,
    Cancelled,
    Internal,
}

/// Where in the request lifecycle an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorPhase {
    Prepare,
    Optimize,
    Provider,
    Streaming,
    Tooling,
}

impl ChatErrorPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Optimize => "optimize",
            Self::Provider => "provider",
            Self::Streaming => "streaming",
            Self::Tooling => "tooling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub phase: ChatErrorPhase,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            phase: ChatErrorPhase::Prepare,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Configuration, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message).with_phase(ChatErrorPhase::Provider)
    }

    pub fn context_optimization(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::ContextOptimization, message).with_phase(ChatErrorPhase::Optimize)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message).with_phase(ChatErrorPhase::Tooling)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Transport, message).with_phase(ChatErrorPhase::Streaming)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Cancelled, message).with_phase(ChatErrorPhase::Streaming)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Internal, message)
    }

    pub fn with_phase(mut self, phase: ChatErrorPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Text safe to hand to the caller; details stay in the logs.
    pub fn public_message(&self) -> &str {
        match self.kind {
            ChatErrorKind::Configuration => PUBLIC_AUTH_MESSAGE,
            ChatErrorKind::InvalidRequest => &self.message,
            _ => PUBLIC_GENERIC_MESSAGE,
        }
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({}): {}", self.kind, self.phase.as_str(), self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let kind = match value.kind {
            ProviderErrorKind::Authentication => ChatErrorKind::Configuration,
            ProviderErrorKind::Transport | ProviderErrorKind::Timeout => ChatErrorKind::Transport,
            ProviderErrorKind::NotFound | ProviderErrorKind::InvalidRequest => {
                ChatErrorKind::InvalidRequest
            }
            _ => ChatErrorKind::Provider,
        };

        ChatError::new(kind, value.message).with_phase(ChatErrorPhase::Provider)
    }
}

impl From<ToolError> for ChatError {
    fn from(value: ToolError) -> Self {
        ChatError::tooling(value.to_string())
    }
}

//! Chat pipeline for the gatehouse gateway.
//!
//! A request flows through three stages:
//! - [`ChatMode::normalize`] pins the caller's mode to `discuss` or `build`,
//! - [`ContextOptimizer`] optionally summarizes history and trims the file set,
//! - [`StreamOrchestrator`] runs the step-bounded tool loop and streams text out.

mod directives;
mod error;
mod mode;
mod optimizer;
mod orchestrator;
mod prompt;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatErrorPhase, ChatEvent, ChatMode, ChatSession, ChatTurn,
        ContextOptimizer, Directives, FileMap, OptimizationOutcome, SessionSummary, StepResult,
        StreamOrchestrator, StreamingOptions,
    };
}

pub use directives::Directives;
pub use error::{
    ChatError, ChatErrorKind, ChatErrorPhase, PUBLIC_AUTH_MESSAGE, PUBLIC_GENERIC_MESSAGE,
};
pub use mode::ChatMode;
pub use optimizer::{ContextOptimizer, OptimizationOutcome, OptimizerSettings};
pub use orchestrator::{
    ChatSession, DEFAULT_CHANNEL_CAPACITY, EventStream, StreamOrchestrator, TextStream,
};
pub use prompt::{file_context, render_transcript, system_prompt};
pub use types::{
    ChatEvent, ChatTurn, DEFAULT_MAX_STEPS, DesignScheme, FileMap, PromptVariant,
    SessionSummary, StepResult, StreamingOptions, SupabaseConnection, SupabaseCredentials,
};

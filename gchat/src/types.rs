//! Chat turn inputs, per-step results, and the session event model.

use std::collections::BTreeMap;

use gcommon::RequestId;
use gprovider::{Message, Role, StopReason, ToolCall, ToolChoice};
use gtooling::ToolError;

use crate::{ChatError, ChatMode};

/// Repository-relative path to file text, ordered so prompts are deterministic.
pub type FileMap = BTreeMap<String, String>;

pub const DEFAULT_MAX_STEPS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesignScheme {
    pub palette: BTreeMap<String, String>,
    pub features: Vec<String>,
    pub font: Vec<String>,
}

impl DesignScheme {
    pub fn is_empty(&self) -> bool {
        self.palette.is_empty() && self.features.is_empty() && self.font.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SupabaseCredentials {
    pub anon_key: Option<String>,
    pub supabase_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SupabaseConnection {
    pub is_connected: bool,
    pub has_selected_project: bool,
    pub credentials: Option<SupabaseCredentials>,
}

impl SupabaseConnection {
    /// Connected with a project chosen and both credentials present.
    pub fn is_ready(&self) -> bool {
        self.is_connected
            && self.has_selected_project
            && self.credentials.as_ref().is_some_and(|credentials| {
                credentials.anon_key.is_some() && credentials.supabase_url.is_some()
            })
    }
}

/// Which system prompt family to assemble, selected by the caller's `promptId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptVariant {
    #[default]
    Default,
    Optimized,
}

impl PromptVariant {
    pub fn from_id(prompt_id: Option<&str>) -> Self {
        match prompt_id.map(str::trim) {
            Some("optimized") => Self::Optimized,
            Some("default") | Some("") | None => Self::Default,
            Some(other) => {
                tracing::debug!(prompt_id = other, "unknown prompt id, using default prompt");
                Self::Default
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Optimized => "optimized",
        }
    }
}

/// Loop controls for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamingOptions {
    pub tool_choice: ToolChoice,
    pub max_steps: u32,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        Self {
            tool_choice: ToolChoice::Auto,
            max_steps: DEFAULT_MAX_STEPS,
            max_tokens: None,
            temperature: None,
        }
    }
}

impl StreamingOptions {
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Everything the orchestrator needs to run one chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub request_id: RequestId,
    pub model: String,
    pub messages: Vec<Message>,
    pub mode: ChatMode,
    pub prompt: PromptVariant,
    pub files: FileMap,
    /// Reduced file set from the optimizer; `None` sends `files` in full.
    pub context_files: Option<FileMap>,
    pub summary: Option<String>,
    pub design_scheme: Option<DesignScheme>,
    pub supabase: Option<SupabaseConnection>,
    pub options: StreamingOptions,
}

impl ChatTurn {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            request_id: RequestId::generate(),
            model: model.into(),
            messages,
            mode: ChatMode::Build,
            prompt: PromptVariant::Default,
            files: FileMap::new(),
            context_files: None,
            summary: None,
            design_scheme: None,
            supabase: None,
            options: StreamingOptions::default(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<RequestId>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptVariant) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_files(mut self, files: FileMap) -> Self {
        self.files = files;
        self
    }

    pub fn with_design_scheme(mut self, design_scheme: DesignScheme) -> Self {
        self.design_scheme = Some(design_scheme);
        self
    }

    pub fn with_supabase(mut self, supabase: SupabaseConnection) -> Self {
        self.supabase = Some(supabase);
        self
    }

    pub fn with_options(mut self, options: StreamingOptions) -> Self {
        self.options = options;
        self
    }

    /// Applies an optimizer result; a fallback leaves the turn unoptimized.
    pub fn with_optimization(mut self, outcome: crate::OptimizationOutcome) -> Self {
        self.summary = outcome.summary;
        self.context_files = outcome.files;
        self
    }

    /// The files the prompt will carry.
    pub fn prompt_files(&self) -> &FileMap {
        self.context_files.as_ref().unwrap_or(&self.files)
    }

    /// Conversation sent to the model. With a summary, history before the last
    /// user message is replaced by the summary in the system prompt.
    pub fn conversation(&self) -> &[Message] {
        if self.summary.is_none() {
            return &self.messages;
        }

        let start = self
            .messages
            .iter()
            .rposition(|message| message.role == Role::User)
            .unwrap_or(0);
        &self.messages[start..]
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.messages.is_empty() {
            return Err(ChatError::invalid_request("at least one message is required"));
        }

        if self.options.max_steps == 0 {
            return Err(ChatError::invalid_request(
                "maxLLMSteps must be a positive integer",
            ));
        }

        Ok(())
    }
}

/// One provider call of the loop and what came of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step_index: u32,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: StopReason,
    pub tool_errors: Vec<ToolError>,
    /// Calls requested on the last budgeted step; never dispatched.
    pub pending_tool_calls: Vec<ToolCall>,
}

impl StepResult {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|call| call.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub steps: u32,
    pub provider_calls: u32,
    pub step_limit_reached: bool,
    pub finish_reason: StopReason,
    pub text_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    StepStarted { step: u32 },
    TextDelta(String),
    ToolCallRequested(ToolCall),
    ToolCallFinished {
        call: ToolCall,
        outcome: Result<String, ToolError>,
    },
    StepFinished(StepResult),
    Error(ChatError),
    Finished(SessionSummary),
}

impl ChatEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Finished(_))
    }
}

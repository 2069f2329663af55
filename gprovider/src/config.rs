//! Provider capability records and the built-in provider catalog.
//!
//! Every backend is described by the same record; behavior differences are
//! expressed through its capability fields, never through per-provider types.
//!
//! ```rust
//! use gprovider::{AuthStyle, ProviderConfig, builtin_providers};
//!
//! let custom = ProviderConfig::new("Acme", "ACME_API_KEY", "https://llm.acme.dev/v1", "acme-large")
//!     .with_base_url_key("ACME_BASE_URL")
//!     .with_tool_support(false);
//! assert_eq!(custom.name(), "Acme");
//! assert!(!custom.supports_tools());
//! assert_eq!(custom.auth_style(), AuthStyle::Bearer);
//!
//! assert!(builtin_providers().iter().any(|config| config.name() == "OpenAI"));
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <credential>`; the credential is mandatory.
    Bearer,
    /// Local runtimes: a credential is forwarded when present but never required.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    name: String,
    credential_key: String,
    base_url_key: Option<String>,
    default_base_url: String,
    default_model: String,
    supports_tools: bool,
    auth_style: AuthStyle,
}

impl ProviderConfig {
    pub fn new(
        name: impl Into<String>,
        credential_key: impl Into<String>,
        default_base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            credential_key: credential_key.into(),
            base_url_key: None,
            default_base_url: default_base_url.into(),
            default_model: default_model.into(),
            supports_tools: true,
            auth_style: AuthStyle::Bearer,
        }
    }

    pub fn with_base_url_key(mut self, key: impl Into<String>) -> Self {
        self.base_url_key = Some(key.into());
        self
    }

    pub fn with_tool_support(mut self, supports_tools: bool) -> Self {
        self.supports_tools = supports_tools;
        self
    }

    pub fn with_auth_style(mut self, auth_style: AuthStyle) -> Self {
        self.auth_style = auth_style;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credential_key(&self) -> &str {
        &self.credential_key
    }

    pub fn base_url_key(&self) -> Option<&str> {
        self.base_url_key.as_deref()
    }

    pub fn default_base_url(&self) -> &str {
        &self.default_base_url
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn supports_tools(&self) -> bool {
        self.supports_tools
    }

    pub fn auth_style(&self) -> AuthStyle {
        self.auth_style
    }

    pub fn requires_credential(&self) -> bool {
        self.auth_style == AuthStyle::Bearer
    }
}

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

/// Built-in providers in registry order.
pub fn builtin_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new("OpenAI", "OPENAI_API_KEY", OPENAI_BASE_URL, "gpt-4o"),
        ProviderConfig::new(
            "Anthropic",
            "ANTHROPIC_API_KEY",
            ANTHROPIC_BASE_URL,
            "claude-3-5-sonnet-latest",
        ),
        ProviderConfig::new(
            "Groq",
            "GROQ_API_KEY",
            "https://api.groq.com/openai/v1",
            "llama-3.3-70b-versatile",
        ),
        ProviderConfig::new(
            "OpenRouter",
            "OPEN_ROUTER_API_KEY",
            "https://openrouter.ai/api/v1",
            "anthropic/claude-3.5-sonnet",
        ),
        ProviderConfig::new(
            "Deepseek",
            "DEEPSEEK_API_KEY",
            "https://api.deepseek.com/v1",
            "deepseek-chat",
        ),
        ProviderConfig::new(
            "Mistral",
            "MISTRAL_API_KEY",
            "https://api.mistral.ai/v1",
            "mistral-large-latest",
        ),
        ProviderConfig::new("xAI", "XAI_API_KEY", "https://api.x.ai/v1", "grok-beta"),
        ProviderConfig::new(
            "Together",
            "TOGETHER_API_KEY",
            "https://api.together.xyz/v1",
            "meta-llama/Llama-3.3-70B-Instruct-Turbo",
        )
        .with_base_url_key("TOGETHER_API_BASE_URL")
        .with_tool_support(false),
        ProviderConfig::new("OpenAILike", "OPENAI_LIKE_API_KEY", "", "")
            .with_base_url_key("OPENAI_LIKE_API_BASE_URL"),
        ProviderConfig::new("Ollama", "OLLAMA_API_KEY", OLLAMA_BASE_URL, "llama3.2")
            .with_base_url_key("OLLAMA_API_BASE_URL")
            .with_tool_support(false)
            .with_auth_style(AuthStyle::None),
        ProviderConfig::new("LMStudio", "LMSTUDIO_API_KEY", LMSTUDIO_BASE_URL, "")
            .with_base_url_key("LMSTUDIO_API_BASE_URL")
            .with_tool_support(false)
            .with_auth_style(AuthStyle::None),
    ]
}

//! Gateway configuration loaded from TOML.
//!
//! Every section is optional; a missing file section falls back to its
//! defaults. [`GatehouseConfig::load`] parses and validates in one step.
//!
//! ```rust
//! use gatehouse::config::GatehouseConfig;
//!
//! let config = GatehouseConfig::from_toml_str(
//!     r#"
//!     [gateway]
//!     default_provider = "Groq"
//!     max_steps_limit = 10
//!
//!     [env]
//!     GROQ_API_KEY = "gsk-platform"
//!     "#,
//! )
//! .expect("valid config");
//!
//! assert_eq!(config.gateway.default_provider, "Groq");
//! assert_eq!(config.gateway.default_max_steps, 5);
//! assert_eq!(config.server.port, 5173);
//! ```

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use gchat::OptimizerSettings;
use gprovider::{AuthStyle, ProviderConfig, ToolChoice, ToolDefinition, builtin_providers};
use gtooling::ToolCatalog;
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading and validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to initialize gateway: {0}")]
    Init(String),
}

/// Top-level gateway configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GatehouseConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Platform environment layer, consulted after the process environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Extra OpenAI-compatible providers appended to the built-in catalog.
    #[serde(default)]
    pub providers: Vec<CustomProviderConfig>,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatehouseConfig {
    /// Reads, parses, and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        self.gateway.validate()?;

        let catalog = self.catalog();
        let mut names = HashSet::new();
        for provider in &catalog {
            if provider.name().trim().is_empty() {
                return Err(ConfigError::Validation(
                    "provider name must not be empty".to_string(),
                ));
            }
            if !names.insert(provider.name().to_ascii_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate provider name '{}'",
                    provider.name()
                )));
            }
        }
        if !names.contains(&self.gateway.default_provider.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "default_provider '{}' is not in the provider catalog",
                self.gateway.default_provider
            )));
        }

        let mut tools = HashSet::new();
        for schema in &self.tools.schemas {
            if !tools.insert(schema.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate tool name '{}'",
                    schema.name
                )));
            }
        }
        self.tool_catalog()?;

        Ok(())
    }

    /// Built-in providers followed by the custom entries, in declaration order.
    pub fn catalog(&self) -> Vec<ProviderConfig> {
        let mut catalog = builtin_providers();
        catalog.extend(self.providers.iter().map(CustomProviderConfig::to_provider_config));
        catalog
    }

    pub fn tool_catalog(&self) -> Result<ToolCatalog, ConfigError> {
        ToolCatalog::from_definitions(self.tools.schemas.iter().map(ToolSchemaConfig::to_definition))
            .map_err(|err| ConfigError::Validation(format!("invalid tool schema: {err}")))
    }

    /// Copy safe to print: platform env values are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for value in copy.env.values_mut() {
            *value = "<redacted>".to_string();
        }
        copy
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.listen_addr, self.port)
            .parse()
            .map_err(|err| {
                ConfigError::Validation(format!(
                    "invalid listen address '{}:{}': {err}",
                    self.listen_addr, self.port
                ))
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5173
}

/// Chat routing defaults and per-request bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Provider used when a request carries no `[Provider: …]` directive.
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used when a request carries no `[Model: …]` directive; the
    /// provider's own default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    #[serde(default = "default_max_steps")]
    pub default_max_steps: u32,

    /// Requested step budgets above this are clamped.
    #[serde(default = "default_max_steps_limit")]
    pub max_steps_limit: u32,

    /// Total timeout for one upstream provider HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// `auto`, `none`, or `required`.
    #[serde(default = "default_tool_choice")]
    pub tool_choice: String,
}

impl GatewayConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_max_steps == 0 {
            return Err(ConfigError::Validation(
                "gateway.default_max_steps must be at least 1".to_string(),
            ));
        }
        if self.max_steps_limit < self.default_max_steps {
            return Err(ConfigError::Validation(format!(
                "gateway.max_steps_limit ({}) is below default_max_steps ({})",
                self.max_steps_limit, self.default_max_steps
            )));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "gateway.channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "gateway.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.parsed_tool_choice()?;
        Ok(())
    }

    pub fn parsed_tool_choice(&self) -> Result<ToolChoice, ConfigError> {
        self.tool_choice
            .parse()
            .map_err(|err: gprovider::ProviderError| ConfigError::Validation(err.message))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_model: None,
            default_max_steps: default_max_steps(),
            max_steps_limit: default_max_steps_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            channel_capacity: default_channel_capacity(),
            tool_choice: default_tool_choice(),
        }
    }
}

fn default_provider() -> String {
    "OpenAI".to_string()
}

fn default_max_steps() -> u32 {
    gchat::DEFAULT_MAX_STEPS
}

fn default_max_steps_limit() -> u32 {
    25
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_channel_capacity() -> usize {
    gchat::DEFAULT_CHANNEL_CAPACITY
}

fn default_tool_choice() -> String {
    "auto".to_string()
}

/// Token and time budgets for the summary and file-selection calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    #[serde(default = "default_selection_max_tokens")]
    pub selection_max_tokens: u32,

    #[serde(default = "default_optimizer_timeout_secs")]
    pub timeout_secs: u64,
}

impl OptimizerConfig {
    pub fn settings(&self) -> OptimizerSettings {
        OptimizerSettings {
            summary_max_tokens: self.summary_max_tokens,
            selection_max_tokens: self.selection_max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            summary_max_tokens: default_summary_max_tokens(),
            selection_max_tokens: default_selection_max_tokens(),
            timeout_secs: default_optimizer_timeout_secs(),
        }
    }
}

fn default_summary_max_tokens() -> u32 {
    1024
}

fn default_selection_max_tokens() -> u32 {
    512
}

fn default_optimizer_timeout_secs() -> u64 {
    60
}

/// Authentication expected by a custom provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderAuth {
    #[default]
    Bearer,
    None,
}

/// A custom OpenAI-compatible backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomProviderConfig {
    pub name: String,

    /// Environment key holding the API key.
    pub credential_key: String,

    #[serde(default)]
    pub base_url: String,

    /// Environment key that overrides `base_url` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_key: Option<String>,

    #[serde(default)]
    pub default_model: String,

    #[serde(default = "default_supports_tools")]
    pub supports_tools: bool,

    #[serde(default)]
    pub auth: ProviderAuth,
}

impl CustomProviderConfig {
    pub fn to_provider_config(&self) -> ProviderConfig {
        let auth_style = match self.auth {
            ProviderAuth::Bearer => AuthStyle::Bearer,
            ProviderAuth::None => AuthStyle::None,
        };
        let mut config = ProviderConfig::new(
            self.name.trim(),
            self.credential_key.as_str(),
            self.base_url.as_str(),
            self.default_model.as_str(),
        )
        .with_tool_support(self.supports_tools)
        .with_auth_style(auth_style);
        if let Some(key) = &self.base_url_key {
            config = config.with_base_url_key(key.as_str());
        }
        config
    }
}

fn default_supports_tools() -> bool {
    true
}

/// Tool schemas offered to the model and the executor that runs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Endpoint of the external tool executor; without it every tool call
    /// fails as unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_url: Option<String>,

    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub schemas: Vec<ToolSchemaConfig>,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            executor_url: None,
            timeout_secs: default_tool_timeout_secs(),
            schemas: Vec::new(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchemaConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON Schema text; must describe an object.
    pub input_schema: String,
}

impl ToolSchemaConfig {
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

//! Process-wide state shared by every route handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gchat::{ContextOptimizer, StreamOrchestrator};
use gobserve::{
    FanoutProviderHooks, FanoutToolHooks, MetricsObservabilityHooks, SafeProviderHooks,
    SafeToolHooks, TracingObservabilityHooks,
};
use gprovider::{
    EnvSnapshot, ModelProvider, ObservedProvider, ProviderError, ProviderFactory,
    ProviderOperationHooks, ProviderRegistry, RegistryCache, ToolChoice,
};
use gtooling::{ToolBridge, ToolExecutor, UnconfiguredToolExecutor};
use tracing::{info, warn};

use crate::config::{ConfigError, GatehouseConfig};

pub struct AppState {
    config: GatehouseConfig,
    env: EnvSnapshot,
    registries: RegistryCache,
    orchestrator: StreamOrchestrator,
    optimizer: ContextOptimizer,
    provider_hooks: Arc<dyn ProviderOperationHooks>,
    tool_choice: ToolChoice,
    started_at: Instant,
}

impl AppState {
    /// Wires explicit collaborators; tests inject scripted ones here.
    pub fn new(
        config: GatehouseConfig,
        env: EnvSnapshot,
        factory: Arc<dyn ProviderFactory>,
        executor: Arc<dyn ToolExecutor>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tool_choice = config.gateway.parsed_tool_choice()?;

        let catalog = Arc::new(config.tool_catalog()?);
        let tool_hooks = FanoutToolHooks::new()
            .with(Arc::new(SafeToolHooks::new(TracingObservabilityHooks)))
            .with(Arc::new(SafeToolHooks::new(MetricsObservabilityHooks)));
        let bridge = ToolBridge::new(catalog, executor)
            .with_hooks(Arc::new(tool_hooks))
            .with_timeout(config.tools.timeout());
        let orchestrator =
            StreamOrchestrator::new(bridge).with_channel_capacity(config.gateway.channel_capacity);

        let provider_hooks = FanoutProviderHooks::new()
            .with(Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)))
            .with(Arc::new(SafeProviderHooks::new(MetricsObservabilityHooks)));

        Ok(Self {
            registries: RegistryCache::new(config.catalog(), factory),
            optimizer: ContextOptimizer::new(config.optimizer.settings()),
            orchestrator,
            provider_hooks: Arc::new(provider_hooks),
            tool_choice,
            env,
            config,
            started_at: Instant::now(),
        })
    }

    /// Production wiring: captured process env over the `[env]` table, the
    /// HTTP provider adapter, and the HTTP tool executor when configured.
    #[cfg(feature = "http-adapter")]
    pub fn from_config(config: GatehouseConfig) -> Result<Self, ConfigError> {
        let env = EnvSnapshot::capture(config.env.clone());
        let factory = gprovider::OpenAiCompatibleFactory::with_timeout(
            config.gateway.request_timeout(),
        )
        .map_err(|err| ConfigError::Init(err.message))?;
        let executor = build_executor(&config)?;

        let state = Self::new(config, env, Arc::new(factory), executor)?;
        info!(
            providers = state.registries.catalog().len(),
            tools = state.orchestrator.bridge().catalog().len(),
            fingerprint = %state.env.fingerprint(),
            "gateway state initialized"
        );
        Ok(state)
    }

    pub fn config(&self) -> &GatehouseConfig {
        &self.config
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// The registry for the current environment snapshot.
    pub fn registry(&self) -> Result<Arc<ProviderRegistry>, ProviderError> {
        self.registries.get_instance(&self.env)
    }

    pub fn orchestrator(&self) -> &StreamOrchestrator {
        &self.orchestrator
    }

    pub fn optimizer(&self) -> &ContextOptimizer {
        &self.optimizer
    }

    /// Tool choice for providers that accept tools.
    pub fn tool_choice(&self) -> ToolChoice {
        self.tool_choice
    }

    /// Wraps a provider so each call reports to the tracing and metrics hooks.
    pub fn observe(&self, provider: Arc<dyn ModelProvider>) -> Arc<dyn ModelProvider> {
        Arc::new(ObservedProvider::new(
            provider,
            Arc::clone(&self.provider_hooks),
        ))
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(feature = "http-executor")]
fn build_executor(config: &GatehouseConfig) -> Result<Arc<dyn ToolExecutor>, ConfigError> {
    let Some(url) = config.tools.executor_url.as_deref() else {
        return Ok(unconfigured_executor(config));
    };

    let client = reqwest::Client::builder()
        .timeout(config.tools.timeout())
        .build()
        .map_err(|err| ConfigError::Init(format!("failed to build tool executor client: {err}")))?;
    Ok(Arc::new(gtooling::HttpToolExecutor::new(client, url)))
}

#[cfg(not(feature = "http-executor"))]
fn build_executor(config: &GatehouseConfig) -> Result<Arc<dyn ToolExecutor>, ConfigError> {
    if config.tools.executor_url.is_some() {
        warn!("tools.executor_url is set but the http-executor feature is disabled");
    }
    Ok(unconfigured_executor(config))
}

fn unconfigured_executor(config: &GatehouseConfig) -> Arc<dyn ToolExecutor> {
    if !config.tools.schemas.is_empty() {
        warn!(
            tools = config.tools.schemas.len(),
            "tool schemas are configured without an executor; tool calls will fail"
        );
    }
    Arc::new(UnconfiguredToolExecutor)
}

//! Provider registry resolved against an environment snapshot.
//!
//! A [`ProviderRegistry`] binds every catalog entry to one [`EnvSnapshot`]. It
//! performs no network I/O: credentials and base URLs are resolved lazily when a
//! provider is opened. [`RegistryCache`] hands out one registry per snapshot
//! fingerprint.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use gprovider::{
//!     CredentialOverrides, CredentialSource, EnvSnapshot, ModelProvider, ProviderBinding,
//!     ProviderError, ProviderFactory, RegistryCache, builtin_providers,
//! };
//!
//! struct NoBackend;
//!
//! impl ProviderFactory for NoBackend {
//!     fn build(&self, binding: ProviderBinding) -> Result<Arc<dyn ModelProvider>, ProviderError> {
//!         Err(ProviderError::unavailable(format!("no backend for {}", binding.config.name())))
//!     }
//! }
//!
//! let cache = RegistryCache::new(builtin_providers(), Arc::new(NoBackend));
//! let snapshot = EnvSnapshot::new(
//!     [("OPENAI_API_KEY", "sk-env")],
//!     Vec::<(String, String)>::new(),
//!     Vec::<(String, String)>::new(),
//! );
//! let registry = cache.get_instance(&snapshot).expect("registry");
//! let openai = registry.get_provider("openai").expect("case-insensitive lookup");
//!
//! let resolved = openai
//!     .resolve_credential(&CredentialOverrides::new())
//!     .expect("credential from env");
//! assert_eq!(resolved.source, CredentialSource::ProcessEnv);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use gcommon::Registry;

use crate::{
    CredentialOverrides, CredentialSource, EnvFingerprint, EnvSnapshot, ModelProvider,
    ProviderConfig, ProviderError, ProviderSettings, ProviderSettingsMap, ResolvedCredential,
    SecretString,
};

pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Everything a backend needs to talk to one provider.
#[derive(Debug, Clone)]
pub struct ProviderBinding {
    pub config: ProviderConfig,
    pub base_url: String,
    pub credential: Option<SecretString>,
}

/// Builds a model provider from a resolved binding.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, binding: ProviderBinding) -> Result<Arc<dyn ModelProvider>, ProviderError>;
}

/// A catalog entry bound to one environment snapshot.
pub struct ProviderInstance {
    config: ProviderConfig,
    env: Arc<EnvSnapshot>,
    factory: Arc<dyn ProviderFactory>,
}

impl ProviderInstance {
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        self.config.name()
    }

    pub fn supports_tools(&self) -> bool {
        self.config.supports_tools()
    }

    pub fn default_model(&self) -> &str {
        self.config.default_model()
    }

    /// Override first, then the snapshot's process, platform, and embedded layers.
    pub fn resolve_credential(&self, overrides: &CredentialOverrides) -> Option<ResolvedCredential> {
        if let Some(key) = overrides.get(self.config.name()) {
            return Some(ResolvedCredential {
                value: key.clone(),
                source: CredentialSource::Override,
            });
        }

        self.env
            .lookup(self.config.credential_key())
            .map(|(layer, value)| ResolvedCredential {
                value: SecretString::new(value),
                source: CredentialSource::from(layer),
            })
    }

    pub fn has_credential(&self, overrides: &CredentialOverrides) -> bool {
        self.resolve_credential(overrides).is_some()
    }

    /// Settings `baseUrl`, then the env value of the base-url key, then the default.
    pub fn resolve_base_url(&self, settings: Option<&ProviderSettings>) -> Option<String> {
        if let Some(url) = settings.and_then(ProviderSettings::base_url) {
            return Some(url.to_string());
        }

        if let Some(url) = self
            .config
            .base_url_key()
            .and_then(|key| self.env.get(key))
        {
            return Some(url.to_string());
        }

        let default = self.config.default_base_url().trim();
        (!default.is_empty()).then(|| default.to_string())
    }

    pub fn open(
        &self,
        overrides: &CredentialOverrides,
        settings: &ProviderSettingsMap,
    ) -> Result<Arc<dyn ModelProvider>, ProviderError> {
        let name = self.config.name();
        let settings = settings.get(name);
        if settings.is_some_and(ProviderSettings::is_disabled) {
            return Err(ProviderError::invalid_request(format!(
                "provider '{name}' is disabled"
            )));
        }

        let credential = self.resolve_credential(overrides).map(|resolved| resolved.value);
        if credential.is_none() && self.config.requires_credential() {
            return Err(ProviderError::authentication(format!(
                "missing API key for provider '{name}'"
            )));
        }

        let base_url = self.resolve_base_url(settings).ok_or_else(|| {
            ProviderError::invalid_request(format!("no base URL configured for provider '{name}'"))
        })?;

        self.factory.build(ProviderBinding {
            config: self.config.clone(),
            base_url,
            credential,
        })
    }
}

impl std::fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderInstance")
            .field("config", &self.config)
            .field("env", &self.env.fingerprint())
            .finish()
    }
}

pub struct ProviderRegistry {
    env: Arc<EnvSnapshot>,
    providers: Registry<String, Arc<ProviderInstance>>,
}

impl ProviderRegistry {
    pub fn new(
        catalog: impl IntoIterator<Item = ProviderConfig>,
        env: Arc<EnvSnapshot>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        let mut providers = Registry::new();
        for config in catalog {
            let instance = ProviderInstance {
                config,
                env: Arc::clone(&env),
                factory: Arc::clone(&factory),
            };
            providers.insert(instance.name().to_string(), Arc::new(instance));
        }

        Self { env, providers }
    }

    /// Exact name first, then an ASCII case-insensitive match.
    pub fn get_provider(&self, name: &str) -> Result<Arc<ProviderInstance>, ProviderError> {
        let name = name.trim();
        self.providers
            .get(name)
            .or_else(|| {
                self.providers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, instance)| instance)
            })
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("unknown provider '{name}'")))
    }

    pub fn all_providers(&self) -> Vec<Arc<ProviderInstance>> {
        self.providers.values().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_provider(name).is_ok()
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn fingerprint(&self) -> EnvFingerprint {
        self.env.fingerprint()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Registries keyed by snapshot fingerprint, oldest evicted first.
pub struct RegistryCache {
    catalog: Vec<ProviderConfig>,
    factory: Arc<dyn ProviderFactory>,
    capacity: usize,
    entries: RwLock<VecDeque<Arc<ProviderRegistry>>>,
}

impl RegistryCache {
    pub fn new(catalog: Vec<ProviderConfig>, factory: Arc<dyn ProviderFactory>) -> Self {
        Self::with_capacity(catalog, factory, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(
        catalog: Vec<ProviderConfig>,
        factory: Arc<dyn ProviderFactory>,
        capacity: usize,
    ) -> Self {
        Self {
            catalog,
            factory,
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::new()),
        }
    }

    pub fn catalog(&self) -> &[ProviderConfig] {
        &self.catalog
    }

    /// Returns the registry for this snapshot, building it on first sight.
    pub fn get_instance(&self, snapshot: &EnvSnapshot) -> Result<Arc<ProviderRegistry>, ProviderError> {
        let fingerprint = snapshot.fingerprint();
        if let Some(registry) = self.find(fingerprint)? {
            return Ok(registry);
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| ProviderError::other("registry cache lock poisoned"))?;
        if let Some(registry) = entries
            .iter()
            .find(|registry| registry.fingerprint() == fingerprint)
        {
            return Ok(Arc::clone(registry));
        }

        let registry = Arc::new(ProviderRegistry::new(
            self.catalog.iter().cloned(),
            Arc::new(snapshot.clone()),
            Arc::clone(&self.factory),
        ));
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Arc::clone(&registry));

        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, fingerprint: EnvFingerprint) -> Result<Option<Arc<ProviderRegistry>>, ProviderError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ProviderError::other("registry cache lock poisoned"))?;

        Ok(entries
            .iter()
            .find(|registry| registry.fingerprint() == fingerprint)
            .cloned())
    }
}

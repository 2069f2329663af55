//! Per-user credential overrides, provider settings, and secret handling.

use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

use crate::EnvLayer;

#[derive(Clone, PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl Debug for SecretString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // SAFETY: zero bytes are valid UTF-8, and the buffer is never read again.
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialSource {
    Override,
    ProcessEnv,
    PlatformEnv,
    Embedded,
}

impl CredentialSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::ProcessEnv => "process-env",
            Self::PlatformEnv => "platform-env",
            Self::Embedded => "embedded",
        }
    }
}

impl Display for CredentialSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EnvLayer> for CredentialSource {
    fn from(layer: EnvLayer) -> Self {
        match layer {
            EnvLayer::Process => Self::ProcessEnv,
            EnvLayer::Platform => Self::PlatformEnv,
            EnvLayer::Embedded => Self::Embedded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub value: SecretString,
    pub source: CredentialSource,
}

/// Caller-supplied API keys keyed by provider name.
///
/// Blank values are ignored on insert so they never shadow the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    keys: HashMap<String, SecretString>,
}

impl CredentialOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provider: impl Into<String>, key: impl Into<String>) {
        let key = SecretString::new(key);
        if key.is_empty() {
            return;
        }

        self.keys.insert(provider.into(), key);
    }

    pub fn with_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.insert(provider, key);
        self
    }

    pub fn get(&self, provider: &str) -> Option<&SecretString> {
        self.keys.get(provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for CredentialOverrides
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut overrides = Self::new();
        for (provider, key) in iter {
            overrides.insert(provider, key);
        }
        overrides
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
}

impl ProviderSettings {
    pub fn is_disabled(&self) -> bool {
        self.enabled == Some(false)
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

pub type ProviderSettingsMap = HashMap<String, ProviderSettings>;

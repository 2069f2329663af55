//! Layered environment snapshots used to resolve provider configuration.
//!
//! A snapshot merges three layers. Lookups consult them in order and skip empty
//! values:
//!
//! 1. `Process`: the process environment at capture time.
//! 2. `Platform`: bindings injected by the hosting platform or deployment config.
//! 3. `Embedded`: values compiled into the binary for the catalog's keys.
//!
//! ```rust
//! use gprovider::{EnvLayer, EnvSnapshot};
//!
//! let snapshot = EnvSnapshot::new(
//!     [("OPENAI_API_KEY", "sk-process")],
//!     [("OPENAI_API_KEY", "sk-platform"), ("GROQ_API_KEY", "gsk-platform")],
//!     Vec::<(String, String)>::new(),
//! );
//!
//! assert_eq!(snapshot.get("OPENAI_API_KEY"), Some("sk-process"));
//! assert_eq!(snapshot.lookup("GROQ_API_KEY"), Some((EnvLayer::Platform, "gsk-platform")));
//! ```

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::ffi::OsString;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvLayer {
    Process,
    Platform,
    Embedded,
}

impl Display for EnvLayer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Process => "process",
            Self::Platform => "platform",
            Self::Embedded => "embedded",
        };

        f.write_str(label)
    }
}

/// Identity of a snapshot's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvFingerprint(u64);

impl Display for EnvFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct EnvSnapshot {
    process: BTreeMap<String, String>,
    platform: BTreeMap<String, String>,
    embedded: BTreeMap<String, String>,
    fingerprint: EnvFingerprint,
}

impl EnvSnapshot {
    pub fn new<P, Q, E, K1, V1, K2, V2, K3, V3>(process: P, platform: Q, embedded: E) -> Self
    where
        P: IntoIterator<Item = (K1, V1)>,
        Q: IntoIterator<Item = (K2, V2)>,
        E: IntoIterator<Item = (K3, V3)>,
        K1: Into<String>,
        V1: Into<String>,
        K2: Into<String>,
        V2: Into<String>,
        K3: Into<String>,
        V3: Into<String>,
    {
        let process = collect_layer(process);
        let platform = collect_layer(platform);
        let embedded = collect_layer(embedded);
        let fingerprint = fingerprint_layers(&[&process, &platform, &embedded]);

        Self {
            process,
            platform,
            embedded,
            fingerprint,
        }
    }

    /// Captures the current process environment on top of the given platform
    /// bindings and the compiled-in values.
    pub fn capture<Q, K, V>(platform: Q) -> Self
    where
        Q: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(utf8_vars(std::env::vars_os()), platform, embedded_env())
    }

    pub fn empty() -> Self {
        Self::new(
            Vec::<(String, String)>::new(),
            Vec::<(String, String)>::new(),
            Vec::<(String, String)>::new(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup(key).map(|(_, value)| value)
    }

    pub fn lookup(&self, key: &str) -> Option<(EnvLayer, &str)> {
        [
            (EnvLayer::Process, &self.process),
            (EnvLayer::Platform, &self.platform),
            (EnvLayer::Embedded, &self.embedded),
        ]
        .into_iter()
        .find_map(|(layer, values)| {
            values
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(|value| (layer, value))
        })
    }

    pub fn layer_len(&self, layer: EnvLayer) -> usize {
        match layer {
            EnvLayer::Process => self.process.len(),
            EnvLayer::Platform => self.platform.len(),
            EnvLayer::Embedded => self.embedded.len(),
        }
    }

    pub fn fingerprint(&self) -> EnvFingerprint {
        self.fingerprint
    }
}

impl Debug for EnvSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSnapshot")
            .field("process_keys", &self.process.len())
            .field("platform_keys", &self.platform.len())
            .field("embedded_keys", &self.embedded.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

fn collect_layer<I, K, V>(values: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    values
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

fn fingerprint_layers(layers: &[&BTreeMap<String, String>]) -> EnvFingerprint {
    let mut hasher = DefaultHasher::new();
    for (position, layer) in layers.iter().enumerate() {
        position.hash(&mut hasher);
        layer.len().hash(&mut hasher);
        for (key, value) in layer.iter() {
            key.hash(&mut hasher);
            value.hash(&mut hasher);
        }
    }

    EnvFingerprint(hasher.finish())
}

macro_rules! compiled_env {
    ($($key:literal),* $(,)?) => {
        [$(($key, option_env!($key))),*]
    };
}

/// Values present in the build environment for the built-in catalog's keys.
pub fn embedded_env() -> Vec<(String, String)> {
    compiled_env![
        "OPENAI_API_KEY",
        "ANTHROPIC_API_KEY",
        "GROQ_API_KEY",
        "OPEN_ROUTER_API_KEY",
        "DEEPSEEK_API_KEY",
        "MISTRAL_API_KEY",
        "XAI_API_KEY",
        "TOGETHER_API_KEY",
        "TOGETHER_API_BASE_URL",
        "OPENAI_LIKE_API_KEY",
        "OPENAI_LIKE_API_BASE_URL",
        "OLLAMA_API_KEY",
        "OLLAMA_API_BASE_URL",
        "LMSTUDIO_API_KEY",
        "LMSTUDIO_API_BASE_URL",
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|value| (key.to_string(), value.to_string())))
    .collect()
}

/// Variables whose name and value are both valid UTF-8; others are skipped.
fn utf8_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

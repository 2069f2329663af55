//! Shared aliases and strongly-typed common values for the gateway crates.
//!
//! ```rust
//! use gcommon::{GenerationOptions, MetadataMap, Registry, RequestId};
//!
//! let request = RequestId::from("req-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("tenant".to_string(), "acme".to_string());
//!
//! let options = GenerationOptions::default().with_max_tokens(256).enable_streaming();
//! assert_eq!(request.as_str(), "req-1");
//! assert!(options.stream);
//!
//! let mut registry = Registry::new();
//! registry.insert("b", 2);
//! registry.insert("a", 1);
//! assert_eq!(registry.keys().copied().collect::<Vec<_>>(), vec!["b", "a"]);
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use gcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Request-scoped identifiers and metadata.

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub type MetadataMap = HashMap<String, String>;

    static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

    /// Identifies one chat request end to end (logs, tool invocations, events).
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct RequestId(String);

    impl RequestId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        /// Process-unique id of the form `req-<unix millis>-<sequence>`.
        pub fn generate() -> Self {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or_default();
            let sequence = NEXT_REQUEST.fetch_add(1, Ordering::Relaxed);
            Self(format!("req-{millis}-{sequence}"))
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for RequestId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for RequestId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for RequestId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod model {
    //! Generation settings shared by request types.

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
        pub stream: bool,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_streaming(mut self, stream: bool) -> Self {
            self.stream = stream;
            self
        }

        pub fn enable_streaming(self) -> Self {
            self.with_streaming(true)
        }
    }
}

pub mod registry {
    //! Insertion-ordered registry map used by the provider and tool catalogs.
    //!
    //! Lookups are hashed; iteration follows the order in which keys were first
    //! inserted. Re-inserting an existing key replaces the value in place.

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        index: HashMap<K, usize>,
        entries: Vec<(K, V)>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                index: HashMap::new(),
                entries: Vec::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash + Clone,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            if let Some(&position) = self.index.get(&key) {
                return Some(std::mem::replace(&mut self.entries[position].1, value));
            }

            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
            None
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.index
                .get(key)
                .map(|&position| &self.entries[position].1)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            let position = self.index.remove(key)?;
            let (_, value) = self.entries.remove(position);
            for slot in self.index.values_mut() {
                if *slot > position {
                    *slot -= 1;
                }
            }

            Some(value)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.index.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.entries.iter().map(|(key, _)| key)
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.entries.iter().map(|(_, value)| value)
        }

        pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
            self.entries.iter().map(|(key, value)| (key, value))
        }

        pub fn len(&self) -> usize {
            self.entries.len()
        }

        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }
    }
}

pub use context::{MetadataMap, RequestId};
pub use future::BoxFuture;
pub use model::GenerationOptions;
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use super::{GenerationOptions, Registry, RequestId};

    #[test]
    fn request_ids_are_unique_and_prefixed() {
        let first = RequestId::generate();
        let second = RequestId::generate();

        assert!(first.as_str().starts_with("req-"));
        assert_ne!(first, second);
        assert_eq!(RequestId::from("req-x").to_string(), "req-x");
    }

    #[test]
    fn generation_options_builder_helpers_set_values() {
        let options = GenerationOptions::default()
            .with_temperature(0.3)
            .with_max_tokens(123)
            .enable_streaming();

        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.max_tokens, Some(123));
        assert!(options.stream);
    }

    #[test]
    fn registry_preserves_insertion_order_across_replace_and_remove() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.insert("gamma".to_string(), 3_u32);
        registry.insert("alpha".to_string(), 1);
        registry.insert("beta".to_string(), 2);
        assert_eq!(registry.insert("alpha".to_string(), 10), Some(1));

        let keys = registry.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, vec!["gamma", "alpha", "beta"]);
        assert_eq!(registry.get("alpha"), Some(&10));

        assert_eq!(registry.remove("gamma"), Some(3));
        assert_eq!(registry.get("beta"), Some(&2));
        assert_eq!(registry.values().copied().collect::<Vec<_>>(), vec![10, 2]);
        assert!(!registry.contains_key("gamma"));
        assert_eq!(registry.len(), 2);
    }
}

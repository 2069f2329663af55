use std::sync::Arc;
use std::time::Duration;

use gprovider::{
    CredentialOverrides, CredentialSource, EnvSnapshot, OpenAiCompatibleFactory,
    ProviderConfig, ProviderErrorKind, ProviderSettings, ProviderSettingsMap, RegistryCache,
    builtin_providers,
};

fn no_values() -> Vec<(String, String)> {
    Vec::new()
}

fn cache() -> RegistryCache {
    let mut catalog = builtin_providers();
    catalog.push(
        ProviderConfig::new("Acme", "ACME_API_KEY", "https://llm.acme.test/v1", "acme-large")
            .with_tool_support(false),
    );
    let factory = OpenAiCompatibleFactory::with_timeout(Duration::from_secs(5))
        .expect("http client should build");

    RegistryCache::new(catalog, Arc::new(factory))
}

#[test]
fn registry_is_idempotent_per_snapshot_and_lists_catalog_in_order() {
    let cache = cache();
    let snapshot = EnvSnapshot::new(no_values(), [("ACME_API_KEY", "acme-secret")], no_values());

    let first = cache.get_instance(&snapshot).expect("registry");
    let second = cache.get_instance(&snapshot.clone()).expect("registry");
    assert!(Arc::ptr_eq(&first, &second));

    let names = first
        .all_providers()
        .iter()
        .map(|provider| provider.name().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names.first().map(String::as_str), Some("OpenAI"));
    assert_eq!(names.last().map(String::as_str), Some("Acme"));

    let acme = first.get_provider("acme").expect("custom provider");
    let credential = acme
        .resolve_credential(&CredentialOverrides::new())
        .expect("platform credential");
    assert_eq!(credential.source, CredentialSource::PlatformEnv);
    assert!(!acme.supports_tools());
}

#[test]
fn open_binds_credentials_and_settings_without_network_io() {
    let cache = cache();
    let registry = cache.get_instance(&EnvSnapshot::empty()).expect("registry");
    let overrides = CredentialOverrides::new().with_key("OpenAI", "sk-user");
    let mut settings = ProviderSettingsMap::new();
    settings.insert(
        "OpenAI".to_string(),
        ProviderSettings {
            enabled: Some(true),
            base_url: Some("https://proxy.internal.test/v1".to_string()),
        },
    );

    let openai = registry
        .get_provider("OpenAI")
        .expect("openai")
        .open(&overrides, &settings)
        .expect("provider opens");
    assert_eq!(openai.name(), "OpenAI");

    let ollama = registry
        .get_provider("Ollama")
        .expect("ollama")
        .open(&CredentialOverrides::new(), &ProviderSettingsMap::new())
        .expect("local runtime needs no key");
    assert_eq!(ollama.name(), "Ollama");

    let missing = registry
        .get_provider("Deepseek")
        .expect("deepseek")
        .open(&CredentialOverrides::new(), &ProviderSettingsMap::new())
        .err()
        .expect("missing key");
    assert_eq!(missing.kind, ProviderErrorKind::Authentication);
    assert_eq!(missing.message, "missing API key for provider 'Deepseek'");
}

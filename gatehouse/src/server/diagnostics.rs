use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use gprovider::EnvLayer;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::cookies::UserCredentials;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub(super) async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugEnvResponse {
    pub success: bool,
    pub platform: String,
    pub uptime_secs: u64,
    pub fingerprint: String,
    pub layers: LayerCounts,
    pub cookies: CookieCounts,
    pub providers: Vec<ProviderStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LayerCounts {
    pub process: usize,
    pub platform: usize,
    pub embedded: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieCounts {
    pub api_keys: usize,
    pub provider_settings: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub credential_key: String,
    pub is_set: bool,
    pub source: Option<String>,
    pub supports_tools: bool,
}

/// Where credentials would come from, without any secret values.
pub(super) async fn handle_debug_env(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], Json<serde_json::Value>) {
    let no_cache = [(header::CACHE_CONTROL, "no-cache")];
    let credentials = UserCredentials::from_headers(&headers);

    let registry = match state.registry() {
        Ok(registry) => registry,
        Err(err) => {
            error!(error = %err, "provider registry unavailable");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                no_cache,
                Json(serde_json::json!({ "success": false, "error": err.message })),
            );
        }
    };

    let providers = registry
        .all_providers()
        .iter()
        .map(|instance| {
            let resolved = instance.resolve_credential(&credentials.overrides);
            ProviderStatus {
                name: instance.name().to_string(),
                credential_key: instance.config().credential_key().to_string(),
                is_set: resolved.is_some(),
                source: resolved.map(|resolved| resolved.source.to_string()),
                supports_tools: instance.supports_tools(),
            }
        })
        .collect();

    let env = state.env();
    let response = DebugEnvResponse {
        success: true,
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        uptime_secs: state.uptime().as_secs(),
        fingerprint: registry.fingerprint().to_string(),
        layers: LayerCounts {
            process: env.layer_len(EnvLayer::Process),
            platform: env.layer_len(EnvLayer::Platform),
            embedded: env.layer_len(EnvLayer::Embedded),
        },
        cookies: CookieCounts {
            api_keys: credentials.overrides.len(),
            provider_settings: credentials.settings.len(),
        },
        providers,
    };

    match serde_json::to_value(&response) {
        Ok(body) => (StatusCode::OK, no_cache, Json(body)),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            no_cache,
            Json(serde_json::json!({ "success": false, "error": err.to_string() })),
        ),
    }
}

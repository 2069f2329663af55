use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use gprovider::CredentialOverrides;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::cookies::UserCredentials;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub(super) struct CheckKeyQuery {
    provider: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatus {
    pub is_set: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KeyStatus {
    fn set(is_set: bool) -> Json<Self> {
        Json(Self {
            is_set,
            error: None,
        })
    }
}

/// `{isSet}` for one provider: cookie override, then the env layers.
pub(super) async fn handle_check_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<CheckKeyQuery>, QueryRejection>,
) -> (StatusCode, Json<KeyStatus>) {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let Some(provider) = query.provider.filter(|name| !name.trim().is_empty()) else {
        warn!("no provider specified in key check");
        return (StatusCode::OK, KeyStatus::set(false));
    };

    let registry = match state.registry() {
        Ok(registry) => registry,
        Err(err) => {
            error!(error = %err, "provider registry unavailable");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(KeyStatus {
                    is_set: false,
                    error: Some("Failed to check API key".to_string()),
                }),
            );
        }
    };
    let Ok(instance) = registry.get_provider(&provider) else {
        warn!(provider = %provider, "key check for unknown provider");
        return (StatusCode::OK, KeyStatus::set(false));
    };

    let credentials = UserCredentials::from_headers(&headers);
    let is_set = instance.has_credential(&credentials.overrides);
    debug!(provider = instance.name(), is_set, "key check");
    (StatusCode::OK, KeyStatus::set(is_set))
}

/// Provider name to resolved key. Cookie keys come first and are kept even
/// for names the registry does not know.
pub(super) async fn handle_export_keys(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BTreeMap<String, String>>, (StatusCode, Json<serde_json::Value>)> {
    let credentials = UserCredentials::from_headers(&headers);
    let registry = state.registry().map_err(|err| {
        error!(error = %err, "provider registry unavailable");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Failed to export API keys" })),
        )
    })?;

    let mut keys = credentials
        .overrides
        .providers()
        .filter_map(|provider| {
            credentials
                .overrides
                .get(provider)
                .map(|key| (provider.to_string(), key.expose().to_string()))
        })
        .collect::<BTreeMap<_, _>>();

    let env_only = CredentialOverrides::new();
    for instance in registry.all_providers() {
        if keys.contains_key(instance.name()) {
            continue;
        }
        if let Some(resolved) = instance.resolve_credential(&env_only) {
            keys.insert(instance.name().to_string(), resolved.value.expose().to_string());
        }
    }

    debug!(count = keys.len(), "exported provider keys");
    Ok(Json(keys))
}

//! Per-user credential inputs carried in cookies.
//!
//! `apiKeys` holds a URL-encoded JSON object of provider name to API key and
//! `providers` one of provider name to `{enabled?, baseUrl?}`. Anything that
//! fails to decode is treated as absent.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use gprovider::{CredentialOverrides, ProviderSettings, ProviderSettingsMap};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const API_KEYS_COOKIE: &str = "apiKeys";
const PROVIDERS_COOKIE: &str = "providers";

#[derive(Debug, Clone, Default)]
pub struct UserCredentials {
    pub overrides: CredentialOverrides,
    pub settings: ProviderSettingsMap,
}

impl UserCredentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cookies = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_cookie_header)
            .collect::<HashMap<_, _>>();

        Self {
            overrides: cookies
                .get(API_KEYS_COOKIE)
                .map(|raw| parse_api_keys(raw))
                .unwrap_or_default(),
            settings: cookies
                .get(PROVIDERS_COOKIE)
                .map(|raw| parse_provider_settings(raw))
                .unwrap_or_default(),
        }
    }
}

/// Splits a `Cookie` header into decoded name/value pairs; later duplicates win
/// once collected into a map.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|item| {
            let (name, value) = item.trim().split_once('=')?;
            let name = percent_decode(name.trim());
            (!name.is_empty()).then(|| (name, percent_decode(value.trim())))
        })
        .collect()
}

/// `decodeURIComponent`-style decoding; malformed escapes are kept literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'%'
            && let Some(byte) = bytes
                .get(index + 1..index + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        {
            decoded.push(byte);
            index += 3;
            continue;
        }
        decoded.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn parse_object(name: &str, raw: &str) -> serde_json::Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            debug!(cookie = name, "ignoring malformed cookie");
            serde_json::Map::new()
        }
    }
}

fn parse_api_keys(raw: &str) -> CredentialOverrides {
    parse_object(API_KEYS_COOKIE, raw)
        .into_iter()
        .filter_map(|(provider, key)| match key {
            Value::String(key) => Some((provider, key)),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsEntry {
    enabled: Option<bool>,
    base_url: Option<String>,
}

fn parse_provider_settings(raw: &str) -> ProviderSettingsMap {
    parse_object(PROVIDERS_COOKIE, raw)
        .into_iter()
        .filter_map(|(provider, entry)| {
            let entry = serde_json::from_value::<SettingsEntry>(entry).ok()?;
            Some((
                provider,
                ProviderSettings {
                    enabled: entry.enabled,
                    base_url: entry.base_url,
                },
            ))
        })
        .collect()
}

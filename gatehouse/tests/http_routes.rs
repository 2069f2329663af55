mod support;

use axum::http::{StatusCode, header};
use gatehouse::GatehouseConfig;
use gprovider::{ProviderError, Role, StreamEvent};
use pretty_assertions::assert_eq;
use serde_json::json;
use support::{
    Script, ScriptedFactory, api_keys_cookie, body_json, body_string, default_app, get, post_chat,
    test_state, text_step, user_chat,
};
use tower::ServiceExt;

const OPENAI_ENV: &[(&str, &str)] = &[("OPENAI_API_KEY", "sk-platform")];

#[tokio::test]
async fn chat_streams_text_with_event_stream_headers() {
    let factory = ScriptedFactory::new().with_stream(Script::Events(text_step("Hello there")));
    let app = default_app(OPENAI_ENV, &factory);

    let response = app
        .oneshot(post_chat(user_chat("Build me a todo app"), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(body_string(response).await, "Hello there");

    let requests = factory.requests();
    assert_eq!(requests.len(), 1);
    let system = &requests[0].messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.contains("working inside a project workspace"));
    assert_eq!(requests[0].model, "gpt-4o");

    let bindings = factory.bindings();
    assert_eq!(bindings[0].provider, "OpenAI");
    assert_eq!(bindings[0].credential.as_deref(), Some("sk-platform"));
}

#[tokio::test]
async fn api_alias_serves_the_same_chat_handler() {
    let factory = ScriptedFactory::new().with_stream(Script::Events(text_step("ok")));
    let app = default_app(OPENAI_ENV, &factory);

    let mut request = post_chat(user_chat("hi"), None);
    *request.uri_mut() = "/api/chat".parse().expect("uri");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn missing_credential_is_rejected_with_the_public_auth_message() {
    let factory = ScriptedFactory::new();
    let app = default_app(&[], &factory);

    let response = app
        .oneshot(post_chat(user_chat("hi"), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, "Invalid or missing API key");
    assert!(factory.requests().is_empty());
}

#[tokio::test]
async fn cookie_key_overrides_the_environment() {
    let factory = ScriptedFactory::new().with_stream(Script::Events(text_step("hi")));
    let app = default_app(OPENAI_ENV, &factory);
    let cookie = api_keys_cookie(json!({ "OpenAI": "sk-cookie" }));

    let response = app
        .oneshot(post_chat(user_chat("hi"), Some(&cookie)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let _ = body_string(response).await;
    assert_eq!(
        factory.bindings()[0].credential.as_deref(),
        Some("sk-cookie")
    );
}

#[tokio::test]
async fn directives_pick_provider_and_model_and_are_stripped() {
    let factory = ScriptedFactory::new().with_stream(Script::Events(text_step("fast")));
    let app = default_app(&[("GROQ_API_KEY", "gsk-test")], &factory);

    let response = app
        .oneshot(post_chat(
            user_chat("[Model: llama-3.1-8b-instant]\n\n[Provider: Groq]\n\nwrite a haiku"),
            None,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "fast");

    let bindings = factory.bindings();
    assert_eq!(bindings[0].provider, "Groq");
    let request = &factory.requests()[0];
    assert_eq!(request.model, "llama-3.1-8b-instant");
    let user = request
        .messages
        .iter()
        .rfind(|message| message.role == Role::User)
        .expect("user message");
    assert_eq!(user.content, "write a haiku");
}

#[tokio::test]
async fn local_providers_open_without_a_key() {
    let factory = ScriptedFactory::new().with_stream(Script::Events(text_step("local")));
    let app = default_app(&[], &factory);

    let response = app
        .oneshot(post_chat(
            user_chat("[Model: llama3.2]\n\n[Provider: Ollama]\n\nhello"),
            None,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "local");
    let binding = &factory.bindings()[0];
    assert_eq!(binding.provider, "Ollama");
    assert_eq!(binding.credential, None);
    assert!(!binding.base_url.is_empty());
}

#[tokio::test]
async fn provider_settings_cookie_can_disable_a_provider() {
    let factory = ScriptedFactory::new();
    let app = default_app(OPENAI_ENV, &factory);
    let cookie = format!(
        "providers={}",
        support::encode_cookie(&json!({ "OpenAI": { "enabled": false } }).to_string())
    );

    let response = app
        .oneshot(post_chat(user_chat("hi"), Some(&cookie)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(factory.bindings().is_empty());
}

#[tokio::test]
async fn unknown_provider_is_a_bad_request() {
    let factory = ScriptedFactory::new();
    let app = default_app(OPENAI_ENV, &factory);

    let response = app
        .oneshot(post_chat(
            user_chat("[Provider: Nonexistent]\n\nhello"),
            None,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Nonexistent"));
}

#[tokio::test]
async fn non_positive_step_budget_is_a_bad_request() {
    let factory = ScriptedFactory::new();
    let app = default_app(OPENAI_ENV, &factory);
    let mut body = user_chat("hi");
    body["maxLLMSteps"] = json!(0);

    let response = app.oneshot(post_chat(body, None)).await.expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_string(response).await,
        "maxLLMSteps must be a positive integer"
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let factory = ScriptedFactory::new();
    let app = default_app(OPENAI_ENV, &factory);
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"messages\": ["))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failure_before_output_is_a_bare_server_error() {
    let factory = ScriptedFactory::new().with_stream(Script::OpenError(
        ProviderError::unavailable("upstream exploded with sk-secret"),
    ));
    let app = default_app(OPENAI_ENV, &factory);

    let response = app
        .oneshot(post_chat(user_chat("hi"), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "");
}

#[tokio::test]
async fn failure_after_output_ends_with_an_error_frame() {
    let factory = ScriptedFactory::new().with_stream(Script::Events(vec![
        Ok(StreamEvent::TextDelta("Hel".to_string())),
        Err(ProviderError::unavailable("connection reset by sk-secret")),
    ]));
    let app = default_app(OPENAI_ENV, &factory);

    let response = app
        .oneshot(post_chat(user_chat("hi"), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Hel\n3:\"An error occurred.\"\n");
}

#[tokio::test]
async fn failed_context_optimization_still_streams() {
    let factory = ScriptedFactory::new()
        .with_completion(Err(ProviderError::unavailable("summary backend down")))
        .with_completion(Err(ProviderError::unavailable("selection backend down")))
        .with_stream(Script::Events(text_step("unoptimized")));
    let app = default_app(OPENAI_ENV, &factory);
    let body = json!({
        "messages": [
            { "role": "user", "content": "make a counter" },
            { "role": "assistant", "content": "done" },
            { "role": "user", "content": "now style it" }
        ],
        "files": {
            "src/App.tsx": { "type": "file", "content": "export default 1;", "isBinary": false }
        },
        "contextOptimization": true
    });

    let response = app.oneshot(post_chat(body, None)).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "unoptimized");
}

#[tokio::test]
async fn check_key_reports_cookie_and_env_credentials() {
    let factory = ScriptedFactory::new();
    let state = test_state(GatehouseConfig::default(), OPENAI_ENV, &factory);
    let cookie = api_keys_cookie(json!({ "Anthropic": "sk-ant" }));

    let cases = [
        ("/check-provider-key?provider=OpenAI", None, true),
        ("/check-provider-key?provider=Anthropic", Some(cookie.as_str()), true),
        ("/check-provider-key?provider=Anthropic", None, false),
        ("/check-provider-key?provider=Nonexistent", None, false),
        ("/check-provider-key", None, false),
        ("/api/check-env-key?provider=openai", None, true),
    ];

    for (uri, cookie, expected) in cases {
        let response = gatehouse::router(state.clone())
            .oneshot(get(uri, cookie))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(body_json(response).await, json!({ "isSet": expected }), "{uri}");
    }
}

#[tokio::test]
async fn check_key_matches_cookie_under_the_catalog_name_only() {
    let factory = ScriptedFactory::new();
    let state = test_state(GatehouseConfig::default(), &[], &factory);
    let canonical = api_keys_cookie(json!({ "Anthropic": "sk-ant" }));
    let lowercase = api_keys_cookie(json!({ "anthropic": "sk-ant" }));

    let cases = [
        ("/check-provider-key?provider=anthropic", canonical.as_str(), true),
        ("/check-provider-key?provider=ANTHROPIC", canonical.as_str(), true),
        ("/check-provider-key?provider=anthropic", lowercase.as_str(), false),
        ("/check-provider-key?provider=Anthropic", lowercase.as_str(), false),
    ];

    for (uri, cookie, expected) in cases {
        let response = gatehouse::router(state.clone())
            .oneshot(get(uri, Some(cookie)))
            .await
            .expect("response");
        assert_eq!(body_json(response).await, json!({ "isSet": expected }), "{uri} {cookie}");
    }
}

#[tokio::test]
async fn export_prefers_cookie_keys_and_omits_unset_providers() {
    let factory = ScriptedFactory::new();
    let app = default_app(
        &[("OPENAI_API_KEY", "sk-env"), ("GROQ_API_KEY", "gsk-env")],
        &factory,
    );
    let cookie = api_keys_cookie(json!({ "OpenAI": "sk-cookie", "Custom": "c-key" }));

    let response = app
        .oneshot(get("/export-provider-keys", Some(&cookie)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "Custom": "c-key",
            "Groq": "gsk-env",
            "OpenAI": "sk-cookie"
        })
    );
}

#[tokio::test]
async fn debug_env_reports_sources_without_secrets() {
    let factory = ScriptedFactory::new();
    let app = default_app(OPENAI_ENV, &factory);
    let cookie = api_keys_cookie(json!({ "Groq": "gsk-cookie-secret" }));

    let response = app
        .oneshot(get("/api/debug-env", Some(&cookie)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_string(response).await;
    assert!(!text.contains("sk-platform"));
    assert!(!text.contains("gsk-cookie-secret"));

    let body: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["layers"]["platform"], json!(1));
    assert_eq!(body["cookies"]["apiKeys"], json!(1));

    let providers = body["providers"].as_array().expect("providers");
    let openai = providers
        .iter()
        .find(|provider| provider["name"] == "OpenAI")
        .expect("OpenAI listed");
    assert_eq!(openai["isSet"], json!(true));
    assert_eq!(openai["source"], json!("platform-env"));
    let groq = providers
        .iter()
        .find(|provider| provider["name"] == "Groq")
        .expect("Groq listed");
    assert_eq!(groq["source"], json!("override"));
}

#[tokio::test]
async fn health_reports_the_crate_version() {
    let factory = ScriptedFactory::new();
    let app = default_app(&[], &factory);

    let response = app.oneshot(get("/health", None)).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })
    );
}

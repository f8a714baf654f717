use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{test, App};
use async_trait::async_trait;
use chat_relay::config::Config;
use chat_relay::model::{UpstreamClient, UpstreamError, UpstreamRequest};
use chat_relay::web::routes;
use chat_relay::AppState;
use serde_json::{json, Value};

struct CountingUpstream {
    calls: AtomicUsize,
    reply: fn() -> Result<Value, UpstreamError>,
}

impl CountingUpstream {
    fn new(reply: fn() -> Result<Value, UpstreamError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamClient for CountingUpstream {
    async fn complete(&self, _request: UpstreamRequest) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)()
    }
}

fn state(upstream: Arc<CountingUpstream>) -> Data<AppState> {
    let config = Config::from_lookup(|key| match key {
        "GROQ_API_KEY" => Some("gsk-test".to_string()),
        _ => None,
    })
    .expect("config should load");
    Data::new(AppState::new(&config, upstream).expect("state should build"))
}

fn always_timeout() -> Result<Value, UpstreamError> {
    Err(UpstreamError::Timeout)
}

async fn post_chat(data: Data<AppState>, body: Value) -> (StatusCode, Value) {
    let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;
    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

fn reply_text(body: &Value) -> &str {
    let choices = body["choices"].as_array().expect("choices array");
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0]["message"]["role"], "assistant");
    choices[0]["message"]["content"]
        .as_str()
        .expect("content string")
}

#[actix_web::test]
async fn hello_is_answered_from_quick_replies_without_upstream() {
    let upstream = CountingUpstream::new(always_timeout);
    let (status, body) = post_chat(
        state(upstream.clone()),
        json!({ "messages": [ { "role": "user", "content": "hello" } ] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(reply_text(&body).starts_with("Hello!"));
    assert_eq!(upstream.calls(), 0);
}

#[actix_web::test]
async fn upstream_reply_is_returned_with_branding_rewritten() {
    let upstream = CountingUpstream::new(|| {
        Ok(json!({
            "choices": [ { "message": { "role": "assistant",
                "content": "Enable automatic updates. Llama 3 recommends a password manager too." } } ]
        }))
    });
    let (status, body) = post_chat(
        state(upstream.clone()),
        json!({ "messages": [
            { "role": "user", "content": "hello" },
            { "role": "assistant", "content": "Hi!" },
            { "role": "user", "content": "How do I keep my laptop safe?" }
        ] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        reply_text(&body),
        "Enable automatic updates. Sentinel recommends a password manager too."
    );
    assert_eq!(upstream.calls(), 1);
}

#[actix_web::test]
async fn gemini_shaped_reply_is_accepted() {
    let upstream = CountingUpstream::new(|| {
        Ok(json!({
            "candidates": [ { "content": { "role": "model",
                "parts": [ { "text": "Backups " }, { "text": "matter." } ] } } ]
        }))
    });
    let (status, body) = post_chat(
        state(upstream),
        json!({ "messages": [ { "role": "user", "content": "Why back up files?" } ] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply_text(&body), "Backups matter.");
}

#[actix_web::test]
async fn upstream_failure_still_answers_with_200() {
    let upstream = CountingUpstream::new(|| {
        Err(UpstreamError::Auth {
            status: 401,
            body: "{\"error\":\"invalid api key\"}".to_string(),
        })
    });
    let (status, body) = post_chat(
        state(upstream.clone()),
        json!({ "messages": [ { "role": "user", "content": "Tell me about firewalls" } ] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let text = reply_text(&body);
    assert!(!text.is_empty());
    assert!(!text.contains("invalid api key"));
    assert_eq!(upstream.calls(), 1);
}

#[actix_web::test]
async fn greeting_keyword_wins_in_fallback() {
    let upstream = CountingUpstream::new(always_timeout);
    let data = state(upstream);
    let (_, greeting) = post_chat(
        data.clone(),
        json!({ "messages": [ { "role": "user", "content": "hello, what is cyber security" } ] }),
    )
    .await;
    let (_, quick) = post_chat(
        data,
        json!({ "messages": [ { "role": "user", "content": "hello" } ] }),
    )
    .await;

    assert_eq!(reply_text(&greeting), reply_text(&quick));
}

#[actix_web::test]
async fn malformed_requests_get_400() {
    let bodies = [
        json!({}),
        json!({ "messages": [] }),
        json!({ "messages": "hello" }),
        json!({ "messages": [ { "role": "assistant", "content": "only me" } ] }),
        json!({ "messages": [ { "role": "system", "content": "rules" } ] }),
        json!({ "messages": [ { "role": "user", "content": "   " } ] }),
    ];

    for body in bodies {
        let upstream = CountingUpstream::new(always_timeout);
        let (status, response) = post_chat(state(upstream.clone()), body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert!(response["error"].is_string(), "body {body}");
        assert_eq!(upstream.calls(), 0);
    }
}

#[actix_web::test]
async fn health_reports_provider_status() {
    let app = test::init_service(
        App::new()
            .app_data(state(CountingUpstream::new(always_timeout)))
            .configure(routes::configure),
    )
    .await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "chat-relay");
    assert_eq!(body["provider"], "groq");
    assert_eq!(body["providerConfigured"], true);
    assert!(body["timestamp"].is_string());
}

#[actix_web::test]
async fn test_route_and_unknown_routes() {
    let app = test::init_service(
        App::new()
            .app_data(state(CountingUpstream::new(always_timeout)))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = test::read_body(resp).await;
    assert_eq!(text, "chat-relay is running");

    let req = test::TestRequest::get().uri("/api/nothing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Endpoint not found");
    assert_eq!(body["availableEndpoints"].as_array().map(Vec::len), Some(3));
}

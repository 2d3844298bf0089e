//! End-to-end integration tests for the Kai chat backend.
//!
//! These tests drive the full pipeline over HTTP: request validation,
//! credential lookup, prompt assembly, the upstream call, reply sanitizing
//! and session bookkeeping.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use kai_agent::{ChatService, GREETING_POLICY, ModelParams};
use kai_config::{GatewayConfig, StaticCredentials};
use kai_core::error::ProviderError;
use kai_core::message::{ConversationId, Message, Role};
use kai_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use kai_core::session::SessionStore;
use kai_gateway::{GatewayState, SharedState, build_router};
use kai_memory::InMemorySessionStore;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted replies in sequence and records
/// every request it receives.
struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn echo() -> Self {
        Self::new(Vec::new())
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let user_text = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        // Empty script: echo the user message back.
        let next = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(format!("echo: {user_text}"))
            } else {
                replies.remove(0)
            }
        };

        next.map(|text| ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    state: SharedState,
    provider: Arc<ScriptedProvider>,
    keys: Arc<Mutex<Vec<String>>>,
}

fn harness(provider: ScriptedProvider, creds: StaticCredentials) -> Harness {
    let provider = Arc::new(provider);
    let keys = Arc::new(Mutex::new(Vec::new()));

    let factory = {
        let provider = provider.clone();
        let keys = keys.clone();
        move |key: &str| -> Arc<dyn Provider> {
            keys.lock().unwrap().push(key.to_string());
            provider.clone()
        }
    };

    let chat = ChatService::new(
        Arc::new(factory),
        Arc::new(creds),
        Arc::new(InMemorySessionStore::new()),
    )
    .with_params(ModelParams::default());

    Harness {
        state: Arc::new(GatewayState {
            chat: Arc::new(chat),
        }),
        provider,
        keys,
    }
}

impl Harness {
    async fn post(&self, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let app = build_router(self.state.clone(), &GatewayConfig::default());
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn history(&self, id: &str) -> Vec<Message> {
        self.state
            .chat
            .sessions()
            .get(&ConversationId::from(id))
            .await
            .unwrap()
            .unwrap_or_default()
    }
}

// ── E2E: Full chat pipeline ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_first_message_builds_full_prompt() {
    let h = harness(
        ScriptedProvider::new(vec![Ok("Hey there! Work stress is heavy. What feels hardest?".into())]),
        StaticCredentials::new("sk-or-test"),
    );

    let (status, body) = h.post(serde_json::json!({"message": "I'm stressed about work"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Work stress is heavy. What feels hardest?");
    let id = body["conversation_id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    // The upstream saw time context, persona, policy, then the message.
    let request = h.provider.last_request();
    assert_eq!(request.model, "google/gemini-flash-1.5");
    assert!((request.temperature - 0.6).abs() < f32::EPSILON);
    assert_eq!(request.max_tokens, Some(350));
    assert_eq!(request.messages.len(), 4);
    assert!(request.messages[0].content.starts_with("Current local datetime: "));
    assert!(request.messages[0].content.contains("| hour24="));
    assert!(request.messages[1].content.contains("'Kai'"));
    assert_eq!(request.messages[2].content, GREETING_POLICY);
    assert_eq!(request.messages[3].role, Role::User);
    assert_eq!(request.messages[3].content, "I'm stressed about work");

    // The sanitized reply is what gets remembered.
    let history = h.history(&id).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "Work stress is heavy. What feels hardest?");

    // Credential was passed to the provider factory.
    assert_eq!(h.keys.lock().unwrap().as_slice(), ["sk-or-test"]);
}

#[tokio::test]
async fn e2e_follow_up_carries_history() {
    let h = harness(ScriptedProvider::echo(), StaticCredentials::new("k"));

    let (_, first) = h.post(serde_json::json!({"message": "I can't sleep"})).await;
    let id = first["conversation_id"].as_str().unwrap().to_string();

    let (status, second) = h
        .post(serde_json::json!({"message": "Since Monday", "conversation_id": id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["conversation_id"], id.as_str());

    let request = h.provider.last_request();
    assert_eq!(request.messages.len(), 6);
    assert_eq!(request.messages[3].content, "I can't sleep");
    assert_eq!(request.messages[4].role, Role::Assistant);
    assert_eq!(request.messages[4].content, "echo: I can't sleep");
    assert_eq!(request.messages[5].content, "Since Monday");
}

#[tokio::test]
async fn e2e_history_capped_at_sixteen_turns() {
    let h = harness(ScriptedProvider::echo(), StaticCredentials::new("k"));

    let (_, first) = h.post(serde_json::json!({"message": "turn 1"})).await;
    let id = first["conversation_id"].as_str().unwrap().to_string();

    for n in 2..=9 {
        let (status, _) = h
            .post(serde_json::json!({"message": format!("turn {n}"), "conversation_id": id}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let history = h.history(&id).await;
    assert_eq!(history.len(), 16);
    // The first exchange was dropped; the oldest kept turn is exchange 2.
    assert_eq!(history[0].content, "turn 2");
    assert_eq!(history[15].content, "echo: turn 9");

    // The tenth request is built from the 16 kept turns.
    h.post(serde_json::json!({"message": "turn 10", "conversation_id": id}))
        .await;
    assert_eq!(h.provider.last_request().messages.len(), 3 + 16 + 1);
}

#[tokio::test]
async fn e2e_unknown_conversation_id_starts_fresh() {
    let h = harness(ScriptedProvider::echo(), StaticCredentials::new("k"));

    let (status, body) = h
        .post(serde_json::json!({"message": "hello?", "conversation_id": "no-such-id"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["conversation_id"].as_str().unwrap();
    assert_ne!(id, "no-such-id");
    assert_eq!(h.provider.last_request().messages.len(), 4);
    assert!(h.history("no-such-id").await.is_empty());
}

#[tokio::test]
async fn e2e_upstream_failure_leaves_history_untouched() {
    let h = harness(
        ScriptedProvider::new(vec![
            Ok("I'm here for you.".into()),
            Err(ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            }),
        ]),
        StaticCredentials::new("k"),
    );

    let (_, first) = h.post(serde_json::json!({"message": "rough day"})).await;
    let id = first["conversation_id"].as_str().unwrap().to_string();

    let (status, body) = h
        .post(serde_json::json!({"message": "still rough", "conversation_id": id}))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"].as_str().unwrap().starts_with("Upstream model error"));

    let history = h.history(&id).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "I'm here for you.");
}

#[tokio::test]
async fn e2e_missing_key_fails_before_upstream() {
    let h = harness(ScriptedProvider::echo(), StaticCredentials::none());

    let (status, body) = h.post(serde_json::json!({"message": "hello"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].is_string());
    assert_eq!(h.provider.calls(), 0);
    assert!(h.keys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn e2e_concurrent_turns_on_one_conversation_are_all_kept() {
    let h = Arc::new(harness(ScriptedProvider::echo(), StaticCredentials::new("k")));

    let (_, first) = h.post(serde_json::json!({"message": "start"})).await;
    let id = first["conversation_id"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for n in 0..3 {
        let h = h.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            h.post(serde_json::json!({"message": format!("parallel {n}"), "conversation_id": id}))
                .await
        }));
    }
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    // 1 + 3 exchanges, none lost to a read-modify-write race.
    assert_eq!(h.history(&id).await.len(), 8);
}

//! Provider adapter tests against mock HTTP servers.
//!
//! Each test points a real agent at a wiremock server and checks the wire
//! format it sends, the headers it authenticates with, and how replies and
//! failures end up in the agent's history.

use agent_duet::agent::{
    AgentConfig, ChatAgent, ConversationalAgent, Message, ProviderKind, Role, create_agent,
};
use agent_duet::sink::{ChannelSink, LogEvent};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn hosted_agent(kind: ProviderKind, server: &MockServer, key: &str) -> ChatAgent {
    create_agent(kind, &AgentConfig::with_api_key(key).base_url(server.uri()))
}

fn with_events(agent: ChatAgent) -> (ChatAgent, UnboundedReceiver<LogEvent>) {
    let (sink, rx) = ChannelSink::new();
    (agent.with_sink(Arc::new(sink)), rx)
}

fn drain(rx: &mut UnboundedReceiver<LogEvent>) -> Vec<LogEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn openai_style_reply(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
    })
}

// ============================================================================
// TEST: Ollama
// ============================================================================

#[tokio::test]
async fn test_ollama_send_appends_user_then_assistant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "stream": false,
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "created_at": "2024-05-01T12:00:00Z",
            "message": {"role": "assistant", "content": "Hi!"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = create_agent(ProviderKind::Ollama, &AgentConfig::with_address(server.uri()));
    agent.set_model("llama3");
    agent.set_system_prompt("Be brief.");

    let reply = agent.send_and_receive("Hello").await;

    assert_eq!(reply, "Hi!");
    assert_eq!(agent.history_len(), 2);
    let history = agent.history();
    assert_eq!(history[0].role, Role::System);
    assert_eq!(history[1], Message::user("Hello"));
    assert_eq!(history[2], Message::assistant("Hi!"));
}

#[tokio::test]
async fn test_ollama_server_error_keeps_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error": "out of memory"}"#))
        .mount(&server)
        .await;

    let (mut agent, mut rx) = with_events(create_agent(
        ProviderKind::Ollama,
        &AgentConfig::with_address(server.uri()),
    ));
    agent.set_model("llama3");

    let reply = agent.send_and_receive("Hello").await;

    assert!(reply.starts_with("Error: Could not generate response - "));
    assert!(reply.contains("out of memory"));
    assert_eq!(agent.history_len(), 1);
    assert_eq!(agent.history()[0], Message::user("Hello"));
    assert!(drain(&mut rx).iter().any(|event| event.is_error()));
}

#[tokio::test]
async fn test_ollama_lists_installed_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3:latest", "modified_at": "2024-05-01T12:00:00Z", "size": 4661224676u64},
                {"name": "mistral:7b", "modified_at": "2024-04-20T08:30:00Z", "size": 4109865159u64}
            ]
        })))
        .mount(&server)
        .await;

    let (agent, mut rx) = with_events(create_agent(
        ProviderKind::Ollama,
        &AgentConfig::with_address(server.uri()),
    ));

    let models = agent.list_available_models().await;

    assert_eq!(models, vec!["llama3:latest", "mistral:7b"]);
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| e.message == "Loaded 2 Ollama models"));
}

#[tokio::test]
async fn test_ollama_unreachable_lists_nothing() {
    let (agent, mut rx) = with_events(create_agent(
        ProviderKind::Ollama,
        &AgentConfig::with_address("http://127.0.0.1:1"),
    ));

    let models = agent.list_available_models().await;

    assert!(models.is_empty());
    let events = drain(&mut rx);
    assert!(
        events
            .iter()
            .any(|e| e.is_error() && e.message.starts_with("Cannot connect to Ollama API at http://127.0.0.1:1"))
    );
}

// ============================================================================
// TEST: OpenAI
// ============================================================================

#[tokio::test]
async fn test_openai_uses_bearer_and_system_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "You are a helpful AI assistant."},
                {"role": "user", "content": "Ping"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_style_reply("Pong")))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = hosted_agent(ProviderKind::OpenAi, &server, "sk-test");
    agent.set_model("gpt-4o-mini");
    agent.set_system_prompt("You are a helpful AI assistant.");

    assert_eq!(agent.send_and_receive("Ping").await, "Pong");
    assert_eq!(agent.history_len(), 2);
}

#[tokio::test]
async fn test_openai_rejected_key_becomes_error_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let mut agent = hosted_agent(ProviderKind::OpenAi, &server, "sk-wrong");
    agent.set_model("gpt-4o");

    let reply = agent.send_and_receive("Ping").await;

    assert!(reply.starts_with("Error:"));
    assert!(reply.contains("401 - Incorrect API key provided"));
    assert_eq!(agent.history_len(), 1);
}

#[tokio::test]
async fn test_openai_catalog_is_static() {
    let server = MockServer::start().await;
    let agent = hosted_agent(ProviderKind::OpenAi, &server, "sk-test");

    let models = agent.list_available_models().await;

    assert!(models.contains(&"gpt-4o".to_string()));
    // No discovery request is made.
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

// ============================================================================
// TEST: Anthropic
// ============================================================================

#[tokio::test]
async fn test_anthropic_headers_and_top_level_system() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-haiku-20240307",
            "system": "",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hello from Claude"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = hosted_agent(ProviderKind::Anthropic, &server, "ant-test");
    agent.set_model("claude-3-haiku-20240307");

    assert_eq!(agent.send_and_receive("Hello").await, "Hello from Claude");
}

// ============================================================================
// TEST: Grok
// ============================================================================

#[tokio::test]
async fn test_grok_caps_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer xai-test"))
        .and(body_partial_json(json!({"model": "grok-2", "max_tokens": 1024})))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_style_reply("Howdy")))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = hosted_agent(ProviderKind::Grok, &server, "xai-test");
    agent.set_model("grok-2");

    assert_eq!(agent.send_and_receive("Hi").await, "Howdy");
}

// ============================================================================
// TEST: Gemini
// ============================================================================

#[tokio::test]
async fn test_gemini_key_in_query_and_model_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "g-test"))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "model", "parts": [{"text": "Hello, let's have a conversation."}]},
                {"role": "user", "parts": [{"text": "Sure"}]}
            ],
            "systemInstruction": {"parts": [{"text": "Be kind."}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Gladly."}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = hosted_agent(ProviderKind::Gemini, &server, "g-test");
    agent.set_model("gemini-1.5-flash");
    agent.set_system_prompt("Be kind.");
    agent.seed_history(Message::assistant("Hello, let's have a conversation."));

    assert_eq!(agent.send_and_receive("Sure").await, "Gladly.");
    assert_eq!(agent.history_len(), 3);
}

#[tokio::test]
async fn test_gemini_listing_filters_and_strips_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(query_param("key", "g-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "models/gemini-1.5-pro"},
                {"name": "models/text-embedding-004"},
                {"name": "models/gemini-1.5-flash"}
            ]
        })))
        .mount(&server)
        .await;

    let agent = hosted_agent(ProviderKind::Gemini, &server, "g-test");

    assert_eq!(
        agent.list_available_models().await,
        vec!["gemini-1.5-pro", "gemini-1.5-flash"]
    );
}

#[tokio::test]
async fn test_gemini_listing_failure_falls_back_without_leaking_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED"}
        })))
        .mount(&server)
        .await;

    let (agent, mut rx) = with_events(hosted_agent(
        ProviderKind::Gemini,
        &server,
        "g-secret-key",
    ));

    let models = agent.list_available_models().await;

    assert_eq!(models, vec!["gemini-1.0-pro", "gemini-1.5-pro", "gemini-1.5-flash"]);
    let events = drain(&mut rx);
    let error = events.iter().find(|e| e.is_error()).expect("error event");
    assert!(error.message.starts_with("Error fetching Gemini models"));
    assert!(error.message.contains("PERMISSION_DENIED: Permission denied"));
    assert!(events.iter().all(|e| !e.message.contains("g-secret-key")));
    assert!(
        events
            .iter()
            .any(|e| e.message == "Using fallback list of 3 Gemini models")
    );
}

#[tokio::test]
async fn test_gemini_unreachable_reply_does_not_leak_key() {
    let mut agent = create_agent(
        ProviderKind::Gemini,
        &AgentConfig::with_api_key("g-secret-key").base_url("http://127.0.0.1:1"),
    );
    agent.set_model("gemini-1.5-pro");

    let reply = agent.send_and_receive("Hi").await;

    assert!(reply.starts_with("Error: Could not generate response - "));
    assert!(!reply.contains("g-secret-key"));
}

// ============================================================================
// TEST: Preconditions across providers
// ============================================================================

#[tokio::test]
async fn test_no_model_never_touches_history() {
    let server = MockServer::start().await;
    for kind in ProviderKind::ALL {
        let config = AgentConfig::with_api_key("k").base_url(server.uri());
        let mut agent = create_agent(kind, &config);

        let reply = agent.send_and_receive("Hello").await;

        assert_eq!(reply, "Error: No model selected", "provider {kind}");
        assert_eq!(agent.history_len(), 0);
    }
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_missing_key_lists_nothing_for_keyed_providers() {
    for kind in [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Grok,
        ProviderKind::Gemini,
    ] {
        let agent = create_agent(kind, &AgentConfig::default());
        assert!(agent.list_available_models().await.is_empty(), "provider {kind}");
    }
}

use quantum_studio::models::Role;
use quantum_studio::providers::claude::ClaudeProvider;
use quantum_studio::providers::gemini::GeminiProvider;
use quantum_studio::providers::openai::OpenAiProvider;
use quantum_studio::providers::{
    AiProvider, ChatMessage, ChatRequest, ModelFetcher, ProviderError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(base: String, headers: Vec<(&str, &str)>) -> ChatRequest {
    ChatRequest {
        model: "test-model".to_string(),
        messages: vec![
            ChatMessage {
                role: Role::System,
                content: "Extra rules.".to_string(),
            },
            ChatMessage::user("Hello"),
        ],
        base_url: Some(base),
        auth_headers: headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        temperature: None,
        system_prompt: Some("Be terse.".to_string()),
        max_tokens: Some(256),
    }
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "stream": false,
            "max_tokens": 256,
            "messages": [{ "role": "system", "content": "Be terse." }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hi there" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = OpenAiProvider::new()
        .send_message(request(
            format!("{}/v1", server.uri()),
            vec![("Authorization", "Bearer sk-test")],
        ))
        .await
        .unwrap();

    assert_eq!(response.content, "Hi there");
    assert_eq!(response.tokens_in, Some(12));
    assert_eq!(response.tokens_out, Some(3));
}

#[tokio::test]
async fn test_openai_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bad-key/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/busy/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new();

    match provider
        .send_message(request(format!("{}/bad-key", server.uri()), vec![]))
        .await
    {
        Err(ProviderError::AuthError(message)) => {
            assert!(message.contains("Incorrect API key provided"))
        }
        other => panic!("Expected AuthError, got {:?}", other),
    }

    assert!(matches!(
        provider
            .send_message(request(format!("{}/busy", server.uri()), vec![]))
            .await,
        Err(ProviderError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn test_openai_requires_base_url() {
    let mut req = request(String::new(), vec![]);
    req.base_url = None;
    assert!(matches!(
        OpenAiProvider::new().send_message(req).await,
        Err(ProviderError::RequestFailed(_))
    ));
}

#[tokio::test]
async fn test_openai_model_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "meta-llama/llama-3-70b", "context_length": 8192 },
                { "id": "mistral-small" }
            ]
        })))
        .mount(&server)
        .await;

    let models = OpenAiProvider::new()
        .fetch_models(&format!("{}/v1/", server.uri()), &[])
        .await
        .unwrap();

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "meta-llama/llama-3-70b");
    assert_eq!(models[0].max_context, Some(8192));
    assert_eq!(models[1].max_context, None);
}

#[tokio::test]
async fn test_claude_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "system": "Be terse.\n\nExtra rules.",
            "messages": [{ "role": "user", "content": "Hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "model": "test-model",
            "stop_reason": "end_turn",
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "Hi" }
            ],
            "usage": { "input_tokens": 5, "output_tokens": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = ClaudeProvider::new()
        .send_message(request(
            format!("{}/v1", server.uri()),
            vec![("x-api-key", "sk-ant"), ("anthropic-version", "2023-06-01")],
        ))
        .await
        .unwrap();

    assert_eq!(response.content, "Hi");
    assert_eq!(response.tokens_in, Some(5));
}

#[tokio::test]
async fn test_gemini_generate_content_and_listing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(header("x-goog-api-key", "g-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "Hello " }, { "text": "back" }] } }],
            "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 2 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "models/gemini-1.5-pro", "displayName": "Gemini 1.5 Pro", "inputTokenLimit": 2000000, "supportedGenerationMethods": ["generateContent"] },
                { "name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"] }
            ]
        })))
        .mount(&server)
        .await;

    let base = format!("{}/v1beta", server.uri());
    let provider = GeminiProvider::new();

    let response = provider
        .send_message(request(base.clone(), vec![("x-goog-api-key", "g-key")]))
        .await
        .unwrap();
    assert_eq!(response.content, "Hello back");

    let models = provider.fetch_models(&base, &[]).await.unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, "gemini-1.5-pro");
    assert_eq!(models[0].max_context, Some(2_000_000));
}

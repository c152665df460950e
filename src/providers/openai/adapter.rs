use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::models::*;
use crate::models::Role;
use crate::providers::traits::{AiProvider, ModelFetcher};
use crate::providers::types::*;

const CHAT_TIMEOUT: Duration = Duration::from_secs(120);
const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Any server speaking the OpenAI chat-completions dialect: OpenAI itself,
/// Groq, Mistral, Together, OpenRouter, Deepseek, and local servers.
pub struct OpenAiProvider {
    client: Client,
}

impl OpenAiProvider {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn translate_role(role: &Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    fn build_messages(system_prompt: Option<&str>, messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        let mut result = Vec::new();

        if let Some(prompt) = system_prompt {
            if !prompt.is_empty() {
                result.push(OpenAiMessage {
                    role: "system".to_string(),
                    content: Some(prompt.to_string()),
                });
            }
        }

        for msg in messages {
            result.push(OpenAiMessage {
                role: Self::translate_role(&msg.role).to_string(),
                content: Some(msg.content.clone()),
            });
        }

        result
    }

    fn require_base(base_url: Option<&str>) -> Result<&str, ProviderError> {
        base_url
            .map(|b| b.trim_end_matches('/'))
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                ProviderError::RequestFailed(
                    "Base URL is required for OpenAI-compatible providers".to_string(),
                )
            })
    }

    fn parse_error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn flavor(&self) -> ApiFlavor {
        ApiFlavor::OpenAiCompatible
    }

    async fn send_message(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let base = Self::require_base(request.base_url.as_deref())?;
        let url = format!("{}/chat/completions", base);

        let openai_request = OpenAiRequest {
            model: request.model.clone(),
            messages: Self::build_messages(request.system_prompt.as_deref(), &request.messages),
            stream: false,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = apply_headers(self.client.post(&url), &request.auth_headers)
            .header("content-type", "application/json")
            .timeout(CHAT_TIMEOUT)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, Self::parse_error_message(status, &body)));
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No content in response".to_string(),
            ));
        }

        let (tokens_in, tokens_out) = openai_response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((None, None));

        Ok(ChatResponse {
            content,
            model: request.model,
            tokens_in,
            tokens_out,
        })
    }
}

#[async_trait]
impl ModelFetcher for OpenAiProvider {
    async fn fetch_models(
        &self,
        base_url: &str,
        auth_headers: &[(String, String)],
    ) -> Result<Vec<ModelDescriptor>, ProviderError> {
        let base = Self::require_base(Some(base_url))?;
        let url = format!("{}/models", base);

        let response = apply_headers(self.client.get(&url), auth_headers)
            .timeout(LIST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(format!("Failed to connect to {}: {}", base, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, Self::parse_error_message(status, &body)));
        }

        let model_list: OpenAiModelList = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse model list: {}", e))
        })?;

        Ok(model_list
            .data
            .into_iter()
            .map(|m| {
                let model = ModelDescriptor::new(m.id.clone(), m.id);
                match m.context_length {
                    Some(tokens) => model.with_context(tokens),
                    None => model,
                }
            })
            .collect())
    }
}

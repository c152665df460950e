use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::models::*;
use crate::models::Role;
use crate::providers::traits::{AiProvider, ModelFetcher};
use crate::providers::types::*;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MAX_TOKENS: u32 = 8192;
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);
const LIST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ClaudeProvider {
    client: Client,
}

impl ClaudeProvider {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn base_url(custom: Option<&str>) -> &str {
        custom.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/')
    }

    fn parse_error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<ClaudeErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }

    fn translate_role(role: &Role) -> Option<&'static str> {
        match role {
            Role::User => Some("user"),
            Role::Assistant => Some("assistant"),
            // Folded into the top-level `system` field instead.
            Role::System => None,
        }
    }

    fn build_messages(messages: &[ChatMessage]) -> Vec<ClaudeMessage> {
        messages
            .iter()
            .filter_map(|msg| {
                Self::translate_role(&msg.role).map(|role| ClaudeMessage {
                    role: role.to_string(),
                    content: msg.content.clone(),
                })
            })
            .collect()
    }

    fn max_tokens(request: &ChatRequest) -> u32 {
        request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

impl Default for ClaudeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for ClaudeProvider {
    fn flavor(&self) -> ApiFlavor {
        ApiFlavor::Anthropic
    }

    async fn send_message(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/messages", Self::base_url(request.base_url.as_deref()));

        let claude_request = ClaudeRequest {
            model: request.model.clone(),
            max_tokens: Self::max_tokens(&request),
            messages: Self::build_messages(&request.messages),
            system: request.combined_system_prompt(),
            temperature: request.temperature,
        };

        let response = apply_headers(self.client.post(&url), &request.auth_headers)
            .header("content-type", "application/json")
            .timeout(CHAT_TIMEOUT)
            .json(&claude_request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, Self::parse_error_message(status, &body)));
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = claude_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ClaudeResponseBlock::Text { text } => Some(text),
                ClaudeResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No content in response".to_string(),
            ));
        }

        let (tokens_in, tokens_out) = claude_response
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
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
impl ModelFetcher for ClaudeProvider {
    async fn fetch_models(
        &self,
        base_url: &str,
        auth_headers: &[(String, String)],
    ) -> Result<Vec<ModelDescriptor>, ProviderError> {
        let url = format!("{}/models", Self::base_url(Some(base_url)));

        let response = apply_headers(self.client.get(&url), auth_headers)
            .timeout(LIST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, Self::parse_error_message(status, &body)));
        }

        let models_response: ClaudeModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(models_response
            .data
            .into_iter()
            .map(|m| {
                let label = if m.display_name.is_empty() {
                    m.id.clone()
                } else {
                    m.display_name
                };
                ModelDescriptor::new(m.id, label)
            })
            .collect())
    }
}

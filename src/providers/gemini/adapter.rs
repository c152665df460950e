use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::models::*;
use crate::models::Role;
use crate::providers::traits::{AiProvider, ModelFetcher};
use crate::providers::types::*;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);
const LIST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GeminiProvider {
    client: Client,
}

impl GeminiProvider {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn base_url(custom: Option<&str>) -> &str {
        custom.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/')
    }

    /// Parse an API error response body into a user-friendly message.
    fn parse_error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
            if let Some(msg) = parsed["error"]["message"].as_str() {
                return format!("HTTP {}: {}", status.as_u16(), msg);
            }
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }

    fn translate_role(role: &Role) -> Option<&'static str> {
        match role {
            Role::User => Some("user"),
            Role::Assistant => Some("model"),
            Role::System => None,
        }
    }

    fn build_contents(messages: &[ChatMessage]) -> Vec<GeminiContent> {
        messages
            .iter()
            .filter_map(|msg| {
                Self::translate_role(&msg.role).map(|role| GeminiContent {
                    role: role.to_string(),
                    parts: vec![GeminiPart {
                        text: Some(msg.content.clone()),
                    }],
                })
            })
            .collect()
    }
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn flavor(&self) -> ApiFlavor {
        ApiFlavor::Gemini
    }

    async fn send_message(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let base = Self::base_url(request.base_url.as_deref());
        let url = format!("{}/models/{}:generateContent", base, request.model);

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        let system_instruction = request.combined_system_prompt().map(|prompt| GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart { text: Some(prompt) }],
        });

        let gemini_request = GeminiRequest {
            contents: Self::build_contents(&request.messages),
            system_instruction,
            generation_config,
        };

        let response = apply_headers(self.client.post(&url), &request.auth_headers)
            .timeout(CHAT_TIMEOUT)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, Self::parse_error_message(status, &body)));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if let Some(error) = gemini_response.error {
            return Err(ProviderError::RequestFailed(
                error.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let content = gemini_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("No content in response".to_string()))?;

        let (tokens_in, tokens_out) = gemini_response
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
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
impl ModelFetcher for GeminiProvider {
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

        let models_response: GeminiModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(models_response
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .as_ref()
                    .is_some_and(|methods| methods.iter().any(|m| m == "generateContent"))
            })
            .map(|m| {
                let id = m.name.strip_prefix("models/").unwrap_or(&m.name).to_string();
                let label = m.display_name.unwrap_or_else(|| id.clone());
                let model = ModelDescriptor::new(id, label);
                match m.input_token_limit {
                    Some(limit) => model.with_context(limit),
                    None => model,
                }
            })
            .collect())
    }
}

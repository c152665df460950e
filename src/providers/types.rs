use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Role;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Failure of a dynamic model listing. Always recovered by the registry.
#[derive(Debug, Error)]
#[error("Failed to fetch models for {provider}: {source}")]
pub struct FetchError {
    pub provider: String,
    #[source]
    pub source: ProviderError,
}

/// Wire dialect spoken by a provider's HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiFlavor {
    Anthropic,
    Gemini,
    OpenAiCompatible,
}

impl ApiFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFlavor::Anthropic => "anthropic",
            ApiFlavor::Gemini => "gemini",
            ApiFlavor::OpenAiCompatible => "openai-compatible",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub label: String,
    /// Context window size, when the provider publishes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context: Option<u32>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            max_context: None,
        }
    }

    pub fn with_context(mut self, tokens: u32) -> Self {
        self.max_context = Some(tokens);
        self
    }
}

// --- Chat types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub base_url: Option<String>,
    /// Rendered auth headers, secret already substituted.
    pub auth_headers: Vec<(String, String)>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
}

impl std::fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.auth_headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ChatRequest")
            .field("model", &self.model)
            .field("messages", &self.messages)
            .field("base_url", &self.base_url)
            .field("auth_headers", &format!("{:?}: ***", header_names))
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ChatRequest {
    /// System prompt followed by the content of any system-role messages.
    pub fn combined_system_prompt(&self) -> Option<String> {
        let mut sections: Vec<&str> = Vec::new();
        if let Some(prompt) = self.system_prompt.as_deref() {
            if !prompt.is_empty() {
                sections.push(prompt);
            }
        }
        for msg in &self.messages {
            if msg.role == Role::System && !msg.content.is_empty() {
                sections.push(&msg.content);
            }
        }
        if sections.is_empty() {
            None
        } else {
            Some(sections.join("\n\n"))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: Option<i64>,
    pub tokens_out: Option<i64>,
}

/// Classify a failed HTTP response the same way for every dialect.
pub(crate) fn status_error(status: reqwest::StatusCode, message: String) -> ProviderError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return ProviderError::AuthError(message);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::RateLimited {
            retry_after_secs: None,
        };
    }
    ProviderError::RequestFailed(message)
}

/// Attach rendered auth headers to an outgoing request.
pub(crate) fn apply_headers(
    mut req: reqwest::RequestBuilder,
    headers: &[(String, String)],
) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        req = req.header(name.as_str(), value.as_str());
    }
    req
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_system_prompt() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: "Be brief.".to_string(),
                },
                ChatMessage::user("hi"),
            ],
            base_url: None,
            auth_headers: Vec::new(),
            temperature: None,
            system_prompt: Some("You summarize.".to_string()),
            max_tokens: None,
        };
        assert_eq!(
            request.combined_system_prompt().as_deref(),
            Some("You summarize.\n\nBe brief.")
        );
    }

    #[test]
    fn test_debug_hides_header_values() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: Vec::new(),
            base_url: None,
            auth_headers: vec![("Authorization".to_string(), "Bearer sk-secret".to_string())],
            temperature: None,
            system_prompt: None,
            max_tokens: None,
        };
        let printed = format!("{:?}", request);
        assert!(printed.contains("Authorization"));
        assert!(!printed.contains("sk-secret"));
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(reqwest::StatusCode::UNAUTHORIZED, "x".into()),
            ProviderError::AuthError(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "x".into()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::BAD_GATEWAY, "x".into()),
            ProviderError::RequestFailed(_)
        ));
    }
}

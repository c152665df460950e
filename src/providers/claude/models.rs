use serde::{Deserialize, Serialize};

// --- Request types ---

#[derive(Debug, Serialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: String,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct ClaudeResponse {
    pub id: String,
    pub content: Vec<ClaudeResponseBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClaudeResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeUsage {
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
}

// --- Models API types ---

#[derive(Debug, Deserialize)]
pub struct ClaudeModelsResponse {
    pub data: Vec<ClaudeModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeModelInfo {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

// --- Error types ---

#[derive(Debug, Deserialize)]
pub struct ClaudeErrorResponse {
    pub error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeErrorDetail {
    pub message: String,
}

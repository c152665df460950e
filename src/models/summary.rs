use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The active condensed history of one conversation.
///
/// Everything up to and including the message `chat_id` is folded into
/// `summary_text`. A newer summary is always built from the previous one and
/// replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: String,
    pub summary_text: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatSummary {
    pub fn new(chat_id: impl Into<String>, summary_text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            summary_text: summary_text.into(),
            created_at: Utc::now(),
        }
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::transcript;
use crate::models::{ChatSummary, ConversationMessage, Credentials, Role};
use crate::providers::catalog::{DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::providers::{
    ChatMessage, ChatRequest, ProviderDescriptor, ProviderError, ProviderRegistry, ProviderRouter,
    RegistryError,
};

const SUMMARY_SYSTEM_PROMPT: &str = "\
You are a software engineer working on a project. Summarize the work done so far and the conversation up to now.

Use exactly this format:
---
# Project Overview
- **Project**: {project_name} - {brief_description}
- **Current Phase**: {phase}
- **Tech Stack**: {languages}, {frameworks}, {key_dependencies}
- **Environment**: {critical_env_details}

# Conversation Context
- **Last Topic**: {main_discussion_point}
- **Key Decisions**: {important_decisions_made}
- **User Context**:
  - Technical Level: {expertise_level}
  - Preferences: {coding_style_preferences}
  - Communication: {preferred_explanation_style}

# Implementation Status
## Current State
- **Active Feature**: {feature_in_development}
- **Progress**: {what_works_and_what_doesnt}
- **Blockers**: {current_challenges}

## Code Evolution
- **Recent Changes**: {latest_modifications}
- **Working Patterns**: {successful_approaches}
- **Failed Approaches**: {attempted_solutions_that_failed}

# Requirements
- **Implemented**: {completed_features}
- **In Progress**: {current_focus}
- **Pending**: {upcoming_features}
- **Technical Constraints**: {critical_constraints}

# Critical Memory
- **Must Preserve**: {crucial_technical_context}
- **User Requirements**: {specific_user_needs}
- **Known Issues**: {documented_problems}

# Next Actions
- **Immediate**: {next_steps}
- **Open Questions**: {unresolved_issues}
---
Keep entries concise and focused on what is needed for continuity.

RULES:
* Only provide the summary of the whole chat so far.
* Do not add new information.
* Start writing immediately.
* Do not write anything other than the summary in the structure above.";

const PREVIOUS_SUMMARY_PREAMBLE: &str = "\
Below is the chat summary so far. It covers the conversation before the messages provided by the user; \
treat it as historical context.\n";

#[derive(Debug, Error)]
pub enum SummarizationError {
    #[error("Cannot summarize an empty transcript")]
    EmptyTranscript,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("No models available for provider {0}")]
    NoModels(String),

    #[error("No API key configured for provider {0}")]
    MissingApiKey(String),

    #[error("Summary request failed: {0}")]
    Llm(#[source] ProviderError),

    #[error("Provider returned an empty summary")]
    EmptySummary,
}

#[derive(Debug, Clone)]
pub struct CompactionPolicy {
    /// Providers for which no summary call is made; a placeholder is returned.
    pub excluded_providers: HashSet<String>,
    /// Used when no user message names a provider/model.
    pub default_provider: String,
    pub default_model: String,
    pub max_tokens: Option<u32>,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            excluded_providers: HashSet::from(["Deepseek".to_string()]),
            default_provider: DEFAULT_PROVIDER.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
        }
    }
}

/// Text returned instead of a real summary for excluded providers.
pub fn skipped_summary_text(provider: &str) -> String {
    format!("Summary generation skipped for {} provider.", provider)
}

/// Folds an over-long transcript into a running summary with one LLM call.
///
/// Stateless per call. Callers must not run two compactions of the same
/// conversation at once; the later result would silently win.
pub struct ContextCompactor {
    registry: Arc<ProviderRegistry>,
    router: Arc<ProviderRouter>,
    policy: CompactionPolicy,
}

impl ContextCompactor {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        router: Arc<ProviderRouter>,
        policy: CompactionPolicy,
    ) -> Self {
        Self {
            registry,
            router,
            policy,
        }
    }

    /// Summarize `messages`, folding in `previous` (or the newest summary
    /// annotation when `previous` is `None`). The result is anchored at the
    /// last message of the transcript.
    pub async fn compact(
        &self,
        messages: &[ConversationMessage],
        previous: Option<&ChatSummary>,
        credentials: &Credentials,
    ) -> Result<ChatSummary, SummarizationError> {
        let last = messages.last().ok_or(SummarizationError::EmptyTranscript)?;

        let (provider, model) = transcript::last_selection(messages);
        let provider = provider.unwrap_or_else(|| self.policy.default_provider.clone());
        let model = model.unwrap_or_else(|| self.policy.default_model.clone());

        if self.policy.excluded_providers.contains(&provider) {
            warn!(provider = %provider, "Provider excluded from summarization, returning placeholder");
            return Ok(ChatSummary::new(last.id.clone(), skipped_summary_text(&provider)));
        }

        let descriptor = self.registry.resolve(&provider)?;
        let api_key = credentials.api_key_for(&descriptor);
        if descriptor.requires_api_key() && api_key.is_none() {
            return Err(SummarizationError::MissingApiKey(provider));
        }
        let model = self.resolve_model(&descriptor, &model, credentials).await?;

        debug!(provider = %provider, model = %model, "Extracting messages since last summary");
        let previous = previous
            .cloned()
            .or_else(|| transcript::latest_summary(messages));
        let pending = match previous.as_ref() {
            Some(summary) => transcript::messages_after(messages, &summary.chat_id),
            None => messages,
        };

        debug!(count = pending.len(), "Sanitizing messages");
        let sanitized: Vec<(Role, String)> = pending
            .iter()
            .map(|m| (m.role, transcript::sanitize(m)))
            .collect();

        let prompt = build_summary_prompt(
            previous.as_ref().map(|s| s.summary_text.as_str()),
            &sanitized,
        );

        let request = ChatRequest {
            model: model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            base_url: Some(credentials.base_url_for(&descriptor)),
            auth_headers: descriptor.render_auth_headers(api_key.as_deref()),
            temperature: None,
            system_prompt: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
            max_tokens: self.policy.max_tokens,
        };

        debug!(provider = %provider, model = %model, "Requesting summary");
        let response = self
            .router
            .send_message(descriptor.flavor, request)
            .await
            .map_err(SummarizationError::Llm)?;

        if response.content.trim().is_empty() {
            return Err(SummarizationError::EmptySummary);
        }

        info!(
            provider = %provider,
            model = %model,
            folded = pending.len(),
            chat_id = %last.id,
            "Chat summary created"
        );

        Ok(ChatSummary::new(last.id.clone(), response.content))
    }

    /// The requested model if the provider knows it, otherwise the first
    /// model it offers. A stale model name never fails the compaction.
    async fn resolve_model(
        &self,
        descriptor: &ProviderDescriptor,
        requested: &str,
        credentials: &Credentials,
    ) -> Result<String, SummarizationError> {
        if descriptor.find_static_model(requested).is_some() {
            return Ok(requested.to_string());
        }

        let models = self.registry.list_models(descriptor, credentials).await;
        if models.iter().any(|m| m.id == requested) {
            return Ok(requested.to_string());
        }

        let first = models
            .first()
            .ok_or_else(|| SummarizationError::NoModels(descriptor.name.clone()))?;
        warn!(
            provider = %descriptor.name,
            requested = %requested,
            fallback = %first.id,
            "Model not found, falling back to first model"
        );
        Ok(first.id.clone())
    }
}

/// User prompt carrying the previous summary and the messages after it.
pub fn build_summary_prompt(previous: Option<&str>, messages: &[(Role, String)]) -> String {
    let old_summary = previous
        .map(|text| format!("{}{}", PREVIOUS_SUMMARY_PREAMBLE, text))
        .unwrap_or_default();

    let new_chats = messages
        .iter()
        .map(|(role, text)| format!("---\n[{}] {}\n---", role.as_str(), text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Here is the previous summary of the chat:\n<old_summary>\n{}\n</old_summary>\n\n\
         Below is the chat after that:\n---\n<new_chats>\n{}\n</new_chats>\n---\n\n\
         Please provide a summary of the chat till now including the historical summary of the chat.",
        old_summary, new_chats
    )
}

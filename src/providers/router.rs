use std::collections::HashMap;
use std::sync::Arc;

use super::claude::ClaudeProvider;
use super::gemini::GeminiProvider;
use super::openai::OpenAiProvider;
use super::traits::AiProvider;
use super::types::{ApiFlavor, ChatRequest, ChatResponse, ProviderError};

/// Dispatches a chat request to the adapter for a wire dialect.
pub struct ProviderRouter {
    providers: HashMap<ApiFlavor, Arc<dyn AiProvider>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Router with the Anthropic, Gemini and OpenAI-compatible adapters.
    pub fn with_default_adapters() -> Self {
        let mut router = Self::new();
        router.register(Arc::new(ClaudeProvider::new()));
        router.register(Arc::new(GeminiProvider::new()));
        router.register(Arc::new(OpenAiProvider::new()));
        router
    }

    pub fn register(&mut self, provider: Arc<dyn AiProvider>) {
        self.providers.insert(provider.flavor(), provider);
    }

    pub async fn send_message(
        &self,
        flavor: ApiFlavor,
        request: ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        let provider = self.providers.get(&flavor).ok_or_else(|| {
            ProviderError::RequestFailed(format!("No adapter for {} API", flavor.as_str()))
        })?;
        provider.send_message(request).await
    }
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::with_default_adapters()
    }
}

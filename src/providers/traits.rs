use async_trait::async_trait;

use super::types::{ApiFlavor, ChatRequest, ChatResponse, ModelDescriptor, ProviderError};

#[async_trait]
pub trait AiProvider: Send + Sync {
    fn flavor(&self) -> ApiFlavor;

    async fn send_message(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Live model listing for providers whose catalogue changes server-side.
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    async fn fetch_models(
        &self,
        base_url: &str,
        auth_headers: &[(String, String)],
    ) -> Result<Vec<ModelDescriptor>, ProviderError>;
}

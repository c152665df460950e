pub mod catalog;
pub mod claude;
pub mod descriptor;
pub mod gemini;
pub mod openai;
pub mod registry;
pub mod router;
pub mod traits;
pub mod types;

pub use descriptor::{ProviderDescriptor, API_KEY_PLACEHOLDER};
pub use registry::{ProviderRegistry, RegistryError};
pub use router::ProviderRouter;
pub use traits::{AiProvider, ModelFetcher};
pub use types::{
    ApiFlavor, ChatMessage, ChatRequest, ChatResponse, FetchError, ModelDescriptor, ProviderError,
};

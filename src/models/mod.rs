pub mod credentials;
pub mod health;
pub mod message;
pub mod summary;

pub use credentials::{Credentials, ProviderSettings};
pub use health::{HealthStatus, ProviderHealth};
pub use message::{ContentPart, ConversationMessage, MessageAnnotation, MessageContent, Role};
pub use summary::ChatSummary;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::providers::ProviderDescriptor;

fn default_enabled() -> bool {
    true
}

/// User-level overrides for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
        }
    }
}

/// API keys and per-provider settings handed to the compactor and prober.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_keys: HashMap<String, String>,
    pub provider_settings: HashMap<String, ProviderSettings>,
    /// Fall back to each provider's `api_key_env` variable.
    pub use_env: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<&String> = self.api_keys.keys().collect();
        providers.sort();
        f.debug_struct("Credentials")
            .field("api_keys", &format!("[{} keys: {:?}]", providers.len(), providers))
            .field("provider_settings", &self.provider_settings)
            .field("use_env", &self.use_env)
            .finish()
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.api_keys.insert(provider.into(), api_key.into());
        self
    }

    pub fn with_settings(mut self, provider: impl Into<String>, settings: ProviderSettings) -> Self {
        self.provider_settings.insert(provider.into(), settings);
        self
    }

    pub fn api_key_for(&self, descriptor: &ProviderDescriptor) -> Option<String> {
        if let Some(key) = self.api_keys.get(&descriptor.name) {
            if !key.trim().is_empty() {
                return Some(key.clone());
            }
        }

        if !self.use_env {
            return None;
        }

        std::env::var(&descriptor.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// The settings override if present, otherwise the descriptor's base URL.
    pub fn base_url_for(&self, descriptor: &ProviderDescriptor) -> String {
        self.provider_settings
            .get(&descriptor.name)
            .and_then(|s| s.base_url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&descriptor.api_base_url)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn is_enabled(&self, provider: &str) -> bool {
        self.provider_settings
            .get(provider)
            .map(|s| s.enabled)
            .unwrap_or(true)
    }

    /// True when the provider can be called: either it needs no key or one is available.
    pub fn can_authenticate(&self, descriptor: &ProviderDescriptor) -> bool {
        !descriptor.requires_api_key() || self.api_key_for(descriptor).is_some()
    }
}

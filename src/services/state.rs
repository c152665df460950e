use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::transcript::annotate_user_text;
use crate::config::AppConfig;
use crate::models::Credentials;
use crate::providers::{ModelDescriptor, ProviderRegistry, RegistryError};

/// Snapshot of the user's current selection. Every update returns a new
/// snapshot and leaves the old one untouched.
#[derive(Clone, PartialEq, Serialize)]
pub struct AppState {
    pub selected_provider: String,
    pub selected_model: Option<String>,
    #[serde(skip_serializing)]
    pub api_keys: BTreeMap<String, String>,
    pub available_models: Vec<ModelDescriptor>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("selected_provider", &self.selected_provider)
            .field("selected_model", &self.selected_model)
            .field("api_keys", &self.api_keys.keys().collect::<Vec<_>>())
            .field("available_models", &self.available_models.len())
            .finish()
    }
}

impl AppState {
    /// Start from the configured default provider, showing its static models.
    pub fn initial(registry: &ProviderRegistry, config: &AppConfig) -> Result<Self, RegistryError> {
        let descriptor = registry.resolve(&config.default_provider)?;
        let state = Self {
            selected_provider: descriptor.name.clone(),
            selected_model: Some(config.default_model.clone()),
            api_keys: config
                .api_keys
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            available_models: Vec::new(),
        };

        // Dynamic-only providers keep the configured model until a refresh.
        if descriptor.static_models.is_empty() {
            return Ok(state);
        }
        Ok(state.with_available_models(descriptor.static_models.clone()))
    }

    pub fn select_provider(
        &self,
        registry: &ProviderRegistry,
        name: &str,
    ) -> Result<Self, RegistryError> {
        let descriptor = registry.resolve(name)?;
        debug!(provider = %descriptor.name, "Provider selected");
        Ok(Self {
            selected_provider: descriptor.name.clone(),
            selected_model: None,
            available_models: Vec::new(),
            ..self.clone()
        })
    }

    pub fn select_model(&self, model: impl Into<String>) -> Self {
        Self {
            selected_model: Some(model.into()),
            ..self.clone()
        }
    }

    /// Set or, with a blank key, remove the key for a provider.
    pub fn update_api_key(&self, provider: &str, api_key: &str) -> Self {
        let mut api_keys = self.api_keys.clone();
        let api_key = api_key.trim();
        if api_key.is_empty() {
            api_keys.remove(provider);
        } else {
            api_keys.insert(provider.to_string(), api_key.to_string());
        }
        Self {
            api_keys,
            ..self.clone()
        }
    }

    /// Replace the model list, keeping the selected model when it is still
    /// offered and otherwise selecting the first one.
    pub fn with_available_models(&self, models: Vec<ModelDescriptor>) -> Self {
        let still_offered = self
            .selected_model
            .as_deref()
            .is_some_and(|selected| models.iter().any(|m| m.id == selected));

        let selected_model = if still_offered {
            self.selected_model.clone()
        } else {
            models.first().map(|m| m.id.clone())
        };

        Self {
            selected_model,
            available_models: models,
            ..self.clone()
        }
    }

    pub async fn refresh_models(
        &self,
        registry: &ProviderRegistry,
        base: &Credentials,
    ) -> Result<Self, RegistryError> {
        let descriptor = registry.resolve(&self.selected_provider)?;
        let models = registry.list_models(&descriptor, &self.credentials(base)).await;
        if models.is_empty() {
            warn!(provider = %descriptor.name, "No models available");
        }
        Ok(self.with_available_models(models))
    }

    /// Keys entered in this session layered over the configured credentials.
    pub fn credentials(&self, base: &Credentials) -> Credentials {
        let mut credentials = base.clone();
        for (provider, key) in &self.api_keys {
            credentials.api_keys.insert(provider.clone(), key.clone());
        }
        credentials
    }

    /// Prefix the current selection onto an outgoing user message.
    pub fn annotate(&self, text: &str) -> String {
        annotate_user_text(
            self.selected_model.as_deref().unwrap_or_default(),
            &self.selected_provider,
            text,
        )
    }
}

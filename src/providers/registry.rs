use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, warn};

use super::catalog;
use super::descriptor::ProviderDescriptor;
use super::types::{FetchError, ModelDescriptor};
use crate::models::Credentials;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider name must not be empty")]
    EmptyName,

    #[error("Duplicate provider name: {0}")]
    DuplicateProvider(String),

    #[error("Provider {provider} has an invalid base URL {url}: {reason}")]
    InvalidBaseUrl {
        provider: String,
        url: String,
        reason: String,
    },

    #[error("Provider {0} has no static models and no dynamic model source")]
    NoModelSource(String),
}

/// Immutable provider table, loaded once. The only mutable part is the cache
/// of the last successful dynamic model list per provider.
pub struct ProviderRegistry {
    providers: Vec<Arc<ProviderDescriptor>>,
    index: HashMap<String, usize>,
    model_cache: RwLock<HashMap<String, Vec<ModelDescriptor>>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Validate and index a provider table.
    pub fn from_descriptors(descriptors: Vec<ProviderDescriptor>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        let mut providers = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            Self::validate(&descriptor)?;
            if index.contains_key(&descriptor.name) {
                return Err(RegistryError::DuplicateProvider(descriptor.name));
            }
            index.insert(descriptor.name.clone(), providers.len());
            providers.push(Arc::new(descriptor));
        }

        debug!(count = providers.len(), "Provider registry loaded");

        Ok(Self {
            providers,
            index,
            model_cache: RwLock::new(HashMap::new()),
        })
    }

    /// The catalogue of hosted and local providers shipped with the app.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_descriptors(catalog::builtin_providers())
    }

    fn validate(descriptor: &ProviderDescriptor) -> Result<(), RegistryError> {
        if descriptor.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        url::Url::parse(&descriptor.api_base_url).map_err(|e| RegistryError::InvalidBaseUrl {
            provider: descriptor.name.clone(),
            url: descriptor.api_base_url.clone(),
            reason: e.to_string(),
        })?;

        if descriptor.static_models.is_empty() && descriptor.dynamic_model_fetcher.is_none() {
            return Err(RegistryError::NoModelSource(descriptor.name.clone()));
        }

        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<ProviderDescriptor>, RegistryError> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.providers[i]))
            .ok_or_else(|| RegistryError::UnknownProvider(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderDescriptor>> {
        self.providers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Static models followed by the live list when it can be fetched.
    ///
    /// A failed fetch is logged and dropped: the static list is always a
    /// usable answer.
    pub async fn list_models(
        &self,
        descriptor: &ProviderDescriptor,
        credentials: &Credentials,
    ) -> Vec<ModelDescriptor> {
        let mut models = descriptor.static_models.clone();

        let Some(fetcher) = descriptor.dynamic_model_fetcher.as_ref() else {
            return models;
        };

        let api_key = credentials.api_key_for(descriptor);
        if descriptor.requires_api_key() && api_key.is_none() {
            debug!(provider = %descriptor.name, "No credentials, skipping dynamic model fetch");
            return models;
        }

        let base_url = credentials.base_url_for(descriptor);
        let headers = descriptor.render_auth_headers(api_key.as_deref());

        match fetcher.fetch_models(&base_url, &headers).await {
            Ok(dynamic) => {
                debug!(provider = %descriptor.name, count = dynamic.len(), "Fetched dynamic models");
                if let Ok(mut cache) = self.model_cache.write() {
                    cache.insert(descriptor.name.clone(), dynamic.clone());
                }
                let known: HashSet<String> = models.iter().map(|m| m.id.clone()).collect();
                models.extend(dynamic.into_iter().filter(|m| !known.contains(&m.id)));
            }
            Err(source) => {
                let err = FetchError {
                    provider: descriptor.name.clone(),
                    source,
                };
                warn!("{}; using static models only", err);
            }
        }

        models
    }

    /// Last successful dynamic listing for a provider, if any.
    pub fn cached_models(&self, name: &str) -> Option<Vec<ModelDescriptor>> {
        self.model_cache
            .read()
            .ok()
            .and_then(|cache| cache.get(name).cloned())
    }
}

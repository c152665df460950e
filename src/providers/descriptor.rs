use std::sync::Arc;

use super::traits::ModelFetcher;
use super::types::{ApiFlavor, ModelDescriptor};

/// Placeholder substituted with the secret in auth header templates.
pub const API_KEY_PLACEHOLDER: &str = "{api_key}";

/// Connection and capability metadata for one provider.
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub flavor: ApiFlavor,
    pub api_base_url: String,
    /// Header name to value template, in send order.
    pub auth_header_template: Vec<(String, String)>,
    pub static_models: Vec<ModelDescriptor>,
    pub dynamic_model_fetcher: Option<Arc<dyn ModelFetcher>>,
    pub test_model: String,
    pub api_key_env: String,
    pub status_page_url: Option<String>,
    /// The status page answers without credentials and is preferred for probing.
    pub public_status: bool,
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("flavor", &self.flavor)
            .field("api_base_url", &self.api_base_url)
            .field("auth_header_template", &self.auth_header_template)
            .field("static_models", &self.static_models.len())
            .field("dynamic_models", &self.dynamic_model_fetcher.is_some())
            .field("test_model", &self.test_model)
            .field("api_key_env", &self.api_key_env)
            .field("status_page_url", &self.status_page_url)
            .field("public_status", &self.public_status)
            .finish()
    }
}

impl ProviderDescriptor {
    pub fn builder(
        name: impl Into<String>,
        flavor: ApiFlavor,
        api_base_url: impl Into<String>,
    ) -> ProviderDescriptorBuilder {
        let name = name.into();
        let api_key_env = derive_env_name(&name);
        ProviderDescriptorBuilder {
            descriptor: ProviderDescriptor {
                name,
                flavor,
                api_base_url: api_base_url.into(),
                auth_header_template: Vec::new(),
                static_models: Vec::new(),
                dynamic_model_fetcher: None,
                test_model: String::new(),
                api_key_env,
                status_page_url: None,
                public_status: false,
            },
        }
    }

    pub fn requires_api_key(&self) -> bool {
        self.auth_header_template
            .iter()
            .any(|(_, template)| template.contains(API_KEY_PLACEHOLDER))
    }

    /// Substitute the key into every template. Secret-bearing headers are
    /// omitted when no key is given; constant headers are always sent.
    pub fn render_auth_headers(&self, api_key: Option<&str>) -> Vec<(String, String)> {
        self.auth_header_template
            .iter()
            .filter_map(|(name, template)| {
                if template.contains(API_KEY_PLACEHOLDER) {
                    api_key.map(|key| (name.clone(), template.replace(API_KEY_PLACEHOLDER, key)))
                } else {
                    Some((name.clone(), template.clone()))
                }
            })
            .collect()
    }

    pub fn models_url(base_url: &str) -> String {
        format!("{}/models", base_url.trim_end_matches('/'))
    }

    pub fn find_static_model(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.static_models.iter().find(|m| m.id == model_id)
    }
}

fn derive_env_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_API_KEY", stem)
}

pub struct ProviderDescriptorBuilder {
    descriptor: ProviderDescriptor,
}

impl ProviderDescriptorBuilder {
    pub fn header(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.descriptor
            .auth_header_template
            .push((name.into(), template.into()));
        self
    }

    pub fn bearer_auth(self) -> Self {
        self.header("Authorization", format!("Bearer {}", API_KEY_PLACEHOLDER))
    }

    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.descriptor.api_key_env = var.into();
        self
    }

    pub fn static_models(mut self, models: Vec<ModelDescriptor>) -> Self {
        self.descriptor.static_models = models;
        self
    }

    pub fn model(mut self, id: &str, label: &str, max_context: u32) -> Self {
        self.descriptor
            .static_models
            .push(ModelDescriptor::new(id, label).with_context(max_context));
        self
    }

    pub fn dynamic_models(mut self, fetcher: Arc<dyn ModelFetcher>) -> Self {
        self.descriptor.dynamic_model_fetcher = Some(fetcher);
        self
    }

    pub fn test_model(mut self, model: impl Into<String>) -> Self {
        self.descriptor.test_model = model.into();
        self
    }

    pub fn status_page(mut self, url: impl Into<String>, public: bool) -> Self {
        self.descriptor.status_page_url = Some(url.into());
        self.descriptor.public_status = public;
        self
    }

    pub fn build(mut self) -> ProviderDescriptor {
        if self.descriptor.test_model.is_empty() {
            if let Some(first) = self.descriptor.static_models.first() {
                self.descriptor.test_model = first.id.clone();
            }
        }
        self.descriptor
    }
}

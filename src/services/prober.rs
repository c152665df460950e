use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::{Credentials, HealthStatus, ProviderHealth};
use crate::providers::types::apply_headers;
use crate::providers::{ProviderDescriptor, ProviderRegistry};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl ProbeConfig {
    /// Upper bound on one provider's probe, retry included.
    ///
    /// A first attempt that runs into `timeout` leaves only `retry_delay`
    /// before this bound, so a hung provider is reported without its retry
    /// ever being sent.
    pub fn deadline(&self) -> Duration {
        self.timeout.saturating_add(self.retry_delay)
    }
}

enum ProbeTarget {
    StatusPage(String),
    ModelList {
        url: String,
        headers: Vec<(String, String)>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Reachable {
    Healthy,
    MissingTestModel(String),
}

#[derive(Debug)]
enum AttemptError {
    /// 401 or 403 from an authenticated endpoint.
    Rejected(u16),
    Transient(String),
}

impl AttemptError {
    fn message(&self) -> String {
        match self {
            AttemptError::Rejected(code) => format!("HTTP {}: API key rejected", code),
            AttemptError::Transient(message) => message.clone(),
        }
    }
}

/// Checks provider reachability. Never fails: every problem is reported as
/// a `ProviderHealth` value.
pub struct StatusProber {
    client: Client,
    config: ProbeConfig,
}

impl StatusProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: ProbeConfig) -> Self {
        Self { client, config }
    }

    /// Probe every registered provider concurrently. One entry per provider,
    /// sorted by name.
    pub async fn probe_all(
        &self,
        registry: &ProviderRegistry,
        credentials: &Credentials,
    ) -> Vec<ProviderHealth> {
        let probes = registry
            .iter()
            .map(|descriptor| self.probe_provider(descriptor, credentials));
        let mut results = join_all(probes).await;
        results.sort_by(|a, b| a.provider.cmp(&b.provider));

        let count = |status: HealthStatus| results.iter().filter(|h| h.status == status).count();
        info!(
            operational = count(HealthStatus::Operational),
            degraded = count(HealthStatus::Degraded),
            down = count(HealthStatus::Down),
            "Probe cycle complete"
        );

        results
    }

    pub async fn probe_provider(
        &self,
        descriptor: &ProviderDescriptor,
        credentials: &Credentials,
    ) -> ProviderHealth {
        let status_url = descriptor.status_page_url.clone();

        if !credentials.is_enabled(&descriptor.name) {
            return ProviderHealth::new(&descriptor.name, HealthStatus::Operational)
                .with_message("provider disabled")
                .with_status_url(status_url);
        }

        let target = match status_url.as_ref() {
            Some(url) if descriptor.public_status => ProbeTarget::StatusPage(url.clone()),
            _ => {
                let api_key = credentials.api_key_for(descriptor);
                if descriptor.requires_api_key() && api_key.is_none() {
                    debug!(provider = %descriptor.name, "No credentials, skipping probe");
                    return ProviderHealth::new(&descriptor.name, HealthStatus::Operational)
                        .with_message("credentials not configured")
                        .with_status_url(status_url);
                }
                ProbeTarget::ModelList {
                    url: ProviderDescriptor::models_url(&credentials.base_url_for(descriptor)),
                    headers: descriptor.render_auth_headers(api_key.as_deref()),
                }
            }
        };

        let deadline = self.config.deadline();
        let health = match tokio::time::timeout(deadline, self.probe_with_retry(descriptor, &target))
            .await
        {
            Ok(health) => health,
            Err(_) => {
                warn!(provider = %descriptor.name, "Probe exceeded {}ms", deadline.as_millis());
                ProviderHealth::new(&descriptor.name, HealthStatus::Degraded)
                    .with_message(format!("Probe timed out after {}ms", deadline.as_millis()))
                    .with_response_time(deadline.as_millis() as u64)
            }
        };

        health.with_status_url(status_url)
    }

    /// Check a key the user has not saved yet. One attempt, no retry.
    pub async fn test_api_key(
        &self,
        descriptor: &ProviderDescriptor,
        api_key: &str,
        credentials: &Credentials,
    ) -> ProviderHealth {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return ProviderHealth::new(&descriptor.name, HealthStatus::Down)
                .with_message("API key is empty");
        }

        let target = ProbeTarget::ModelList {
            url: ProviderDescriptor::models_url(&credentials.base_url_for(descriptor)),
            headers: descriptor.render_auth_headers(Some(api_key)),
        };

        let started = Instant::now();
        let health = match self.attempt(&target, &descriptor.test_model).await {
            Ok(Reachable::Healthy) => {
                ProviderHealth::new(&descriptor.name, HealthStatus::Operational)
                    .with_message("API key accepted")
            }
            Ok(Reachable::MissingTestModel(message)) => {
                ProviderHealth::new(&descriptor.name, HealthStatus::Degraded).with_message(message)
            }
            Err(AttemptError::Rejected(_)) => {
                ProviderHealth::new(&descriptor.name, HealthStatus::Down)
                    .with_message("API key rejected")
            }
            Err(AttemptError::Transient(message)) => {
                ProviderHealth::new(&descriptor.name, HealthStatus::Degraded).with_message(message)
            }
        };

        health.with_response_time(elapsed_ms(started))
    }

    async fn probe_with_retry(
        &self,
        descriptor: &ProviderDescriptor,
        target: &ProbeTarget,
    ) -> ProviderHealth {
        let started = Instant::now();
        let name = descriptor.name.as_str();

        // Any failure, a rejected key included, gets exactly one retry.
        let (status, message) = match self.attempt(target, &descriptor.test_model).await {
            Ok(Reachable::Healthy) => (HealthStatus::Operational, None),
            Ok(Reachable::MissingTestModel(message)) => (HealthStatus::Degraded, Some(message)),
            Err(first) => {
                debug!(provider = %name, error = %first.message(), "Probe failed, retrying");
                tokio::time::sleep(self.config.retry_delay).await;

                match self.attempt(target, &descriptor.test_model).await {
                    Ok(Reachable::Healthy) => (
                        HealthStatus::Degraded,
                        Some("recovered after retry".to_string()),
                    ),
                    Ok(Reachable::MissingTestModel(message)) => {
                        (HealthStatus::Degraded, Some(message))
                    }
                    Err(second) => {
                        let message = second.message();
                        warn!(provider = %name, error = %message, "Probe failed after retry");
                        (HealthStatus::Degraded, Some(message))
                    }
                }
            }
        };

        let health = ProviderHealth::new(name, status).with_response_time(elapsed_ms(started));
        match message {
            Some(message) => health.with_message(message),
            None => health,
        }
    }

    async fn attempt(&self, target: &ProbeTarget, test_model: &str) -> Result<Reachable, AttemptError> {
        match target {
            ProbeTarget::StatusPage(url) => {
                let response = self
                    .client
                    .head(url)
                    .timeout(self.config.timeout)
                    .send()
                    .await
                    .map_err(|e| AttemptError::Transient(describe_request_error(&e)))?;

                if response.status().is_server_error() {
                    return Err(AttemptError::Transient(format!(
                        "Status page returned HTTP {}",
                        response.status().as_u16()
                    )));
                }
                Ok(Reachable::Healthy)
            }
            ProbeTarget::ModelList { url, headers } => {
                let response = apply_headers(self.client.get(url), headers)
                    .timeout(self.config.timeout)
                    .send()
                    .await
                    .map_err(|e| AttemptError::Transient(describe_request_error(&e)))?;

                let status = response.status();
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(AttemptError::Rejected(status.as_u16()));
                }
                if !status.is_success() {
                    return Err(AttemptError::Transient(format!("HTTP {}", status.as_u16())));
                }

                let body: Value = match response.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        debug!(url = %url, error = %e, "Model listing is not JSON");
                        return Ok(Reachable::Healthy);
                    }
                };

                let ids = extract_model_ids(&body);
                if !test_model.is_empty() && !ids.is_empty() && !ids.iter().any(|id| id == test_model) {
                    return Ok(Reachable::MissingTestModel(format!(
                        "Test model {} not found",
                        test_model
                    )));
                }
                Ok(Reachable::Healthy)
            }
        }
    }
}

impl Default for StatusProber {
    fn default() -> Self {
        Self::new(ProbeConfig::default())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Model ids from any of the listing shapes providers use: a bare array,
/// `{ "data": [...] }`, `{ "models": [...] }` or `{ "model": ... }`.
fn extract_model_ids(body: &Value) -> Vec<String> {
    let entries: Vec<&Value> = match body {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => ["data", "models", "model"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|v| match v {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(id) => Some(id.as_str()),
            Value::Object(map) => map
                .get("id")
                .or_else(|| map.get("name"))
                .and_then(Value::as_str),
            _ => None,
        })
        .map(|id| id.strip_prefix("models/").unwrap_or(id).to_string())
        .collect()
}

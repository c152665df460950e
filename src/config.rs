use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Credentials, ProviderSettings};
use crate::providers::catalog::{DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::services::{CompactionPolicy, ProbeConfig};

pub const APP_DIR: &str = "quantum-studio";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub timeout_secs: u64,
    pub retry_delay_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_provider: String,
    pub default_model: String,
    pub summary_excluded_providers: Vec<String>,
    pub summary_max_tokens: Option<u32>,
    pub probe: ProbeSettings,
    pub api_keys: HashMap<String, String>,
    pub providers: HashMap<String, ProviderSettings>,
    /// Read `<PROVIDER>_API_KEY` variables for providers without a configured key.
    pub use_env_keys: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            summary_excluded_providers: vec!["Deepseek".to_string()],
            summary_max_tokens: None,
            probe: ProbeSettings::default(),
            api_keys: HashMap::new(),
            providers: HashMap::new(),
            use_env_keys: true,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keyed: Vec<&String> = self.api_keys.keys().collect();
        keyed.sort();
        f.debug_struct("AppConfig")
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("summary_excluded_providers", &self.summary_excluded_providers)
            .field("summary_max_tokens", &self.summary_max_tokens)
            .field("probe", &self.probe)
            .field("api_keys", &keyed)
            .field("providers", &self.providers)
            .field("use_env_keys", &self.use_env_keys)
            .finish()
    }
}

impl AppConfig {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_with_overrides(&path)
    }

    pub fn load_with_overrides(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(
            std::env::var("QUANTUM_DEFAULT_PROVIDER").ok(),
            std::env::var("QUANTUM_DEFAULT_MODEL").ok(),
        );
        Ok(config)
    }

    /// A missing file yields defaults; an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Write a default config to `path`. An existing file is only replaced
    /// with `force`.
    pub fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("Config file {} already exists", path.display());
        }
        Self::default().save_to(path)?;
        info!(path = %path.display(), "Wrote default config");
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        resolve_path(
            std::env::var("QUANTUM_CONFIG").ok(),
            std::env::var("XDG_CONFIG_HOME").ok(),
            std::env::var("HOME").ok(),
        )
    }

    fn apply_overrides(&mut self, provider: Option<String>, model: Option<String>) {
        if let Some(provider) = provider.filter(|p| !p.trim().is_empty()) {
            self.default_provider = provider.trim().to_string();
        }
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.default_model = model.trim().to_string();
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_keys: self.api_keys.clone(),
            provider_settings: self.providers.clone(),
            use_env: self.use_env_keys,
        }
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            timeout: Duration::from_secs(self.probe.timeout_secs),
            retry_delay: Duration::from_millis(self.probe.retry_delay_ms),
        }
    }

    pub fn compaction_policy(&self) -> CompactionPolicy {
        CompactionPolicy {
            excluded_providers: self
                .summary_excluded_providers
                .iter()
                .cloned()
                .collect::<HashSet<_>>(),
            default_provider: self.default_provider.clone(),
            default_model: self.default_model.clone(),
            max_tokens: self.summary_max_tokens,
        }
    }
}

fn resolve_path(
    explicit: Option<String>,
    xdg_config_home: Option<String>,
    home: Option<String>,
) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let config_dir = match (xdg_config_home.filter(|p| !p.is_empty()), home) {
        (Some(dir), _) => PathBuf::from(dir),
        (None, Some(home)) => PathBuf::from(home).join(".config"),
        (None, None) => bail!("Neither XDG_CONFIG_HOME nor HOME is set"),
    };
    Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.default_provider, DEFAULT_PROVIDER);
        assert_eq!(config.summary_excluded_providers, vec!["Deepseek"]);
        assert_eq!(config.probe, ProbeSettings::default());
        assert!(config.use_env_keys);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "default_provider": "Groq",
                "probe": { "timeout_secs": 3 },
                "api_keys": { "Groq": "gsk-test" },
                "providers": { "Ollama": { "enabled": false }, "OpenAI": { "base_url": "http://proxy.local/v1" } }
            }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_provider, "Groq");
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.probe.timeout_secs, 3);
        assert_eq!(config.probe.retry_delay_ms, 1000);

        let credentials = config.credentials();
        assert_eq!(credentials.api_keys.get("Groq").map(String::as_str), Some("gsk-test"));
        assert!(!credentials.is_enabled("Ollama"));
        assert!(credentials.is_enabled("OpenAI"));
        assert!(credentials.use_env);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.summary_max_tokens = Some(2048);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.summary_max_tokens, Some(2048));
    }

    #[test]
    fn test_write_default_keeps_existing_file_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        AppConfig::write_default(&path, false).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().default_model, DEFAULT_MODEL);

        std::fs::write(&path, r#"{"default_model": "mine"}"#).unwrap();
        assert!(AppConfig::write_default(&path, false).is_err());
        assert_eq!(AppConfig::load_from(&path).unwrap().default_model, "mine");

        AppConfig::write_default(&path, true).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().default_model, DEFAULT_MODEL);
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some("  ".to_string()), Some("gpt-4o".to_string()));
        assert_eq!(config.default_provider, DEFAULT_PROVIDER);
        assert_eq!(config.default_model, "gpt-4o");
    }

    #[test]
    fn test_derived_service_settings() {
        let mut config = AppConfig::default();
        config.probe.retry_delay_ms = 250;
        config.summary_excluded_providers.push("Groq".to_string());

        let probe = config.probe_config();
        assert_eq!(probe.timeout, Duration::from_secs(10));
        assert_eq!(probe.retry_delay, Duration::from_millis(250));

        let policy = config.compaction_policy();
        assert!(policy.excluded_providers.contains("Deepseek"));
        assert!(policy.excluded_providers.contains("Groq"));
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            resolve_path(Some("/tmp/q.json".into()), None, None).unwrap(),
            PathBuf::from("/tmp/q.json")
        );
        assert_eq!(
            resolve_path(None, Some("/xdg".into()), Some("/home/u".into())).unwrap(),
            PathBuf::from("/xdg/quantum-studio/config.json")
        );
        assert_eq!(
            resolve_path(None, None, Some("/home/u".into())).unwrap(),
            PathBuf::from("/home/u/.config/quantum-studio/config.json")
        );
        assert!(resolve_path(None, None, None).is_err());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let mut config = AppConfig::default();
        config.api_keys.insert("OpenAI".to_string(), "sk-secret".to_string());
        let printed = format!("{:?}", config);
        assert!(printed.contains("OpenAI"));
        assert!(!printed.contains("sk-secret"));
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quantum_studio::config::AppConfig;
use quantum_studio::models::{ChatSummary, ConversationMessage, HealthStatus};
use quantum_studio::providers::{ProviderRegistry, ProviderRouter};
use quantum_studio::services::{AppState, ContextCompactor, StatusProber};

#[derive(Parser, Debug)]
#[command(name = "quantum", version, about = "Quantum Studio provider tools")]
struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered providers.
    Providers,

    /// Probe every provider and print its health.
    Status {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List the models a provider offers.
    Models { provider: String },

    /// Summarize a transcript (JSON array of messages).
    Summarize {
        transcript: PathBuf,
        /// Previous summary (JSON) to fold in.
        #[arg(long)]
        previous: Option<PathBuf>,
    },

    /// Check an API key without saving it.
    TestKey { provider: String, api_key: String },

    /// Write a default config file.
    Init {
        /// Replace an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => AppConfig::default_path()?,
        };
        AppConfig::write_default(&path, force)?;
        println!("{}", path.display());
        return Ok(());
    }

    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_with_overrides(path)?,
        None => AppConfig::load()?,
    };
    let registry = Arc::new(ProviderRegistry::builtin().context("Invalid provider catalogue")?);
    let credentials = config.credentials();

    match cli.command {
        Commands::Providers => {
            for descriptor in registry.iter() {
                let key = if !descriptor.requires_api_key() {
                    "no key needed"
                } else if credentials.can_authenticate(descriptor) {
                    "key configured"
                } else {
                    "no key"
                };
                println!(
                    "{:<14} {:<18} {:>3} models  {}",
                    descriptor.name,
                    descriptor.flavor.as_str(),
                    descriptor.static_models.len(),
                    key
                );
            }
        }
        Commands::Status { json } => {
            let prober = StatusProber::new(config.probe_config());
            let results = prober.probe_all(&registry, &credentials).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for health in &results {
                    let timing = health
                        .response_time_ms
                        .map(|ms| format!("{}ms", ms))
                        .unwrap_or_default();
                    println!(
                        "{:<14} {:<12} {:>7}  {}",
                        health.provider,
                        health.status.as_str(),
                        timing,
                        health.message.as_deref().unwrap_or("")
                    );
                }
            }
        }
        Commands::Models { provider } => {
            let state = AppState::initial(&registry, &config)
                .context("Invalid default provider")?
                .select_provider(&registry, &provider)?
                .refresh_models(&registry, &credentials)
                .await?;

            for model in &state.available_models {
                match model.max_context {
                    Some(tokens) => println!("{:<40} {} ({} tokens)", model.id, model.label, tokens),
                    None => println!("{:<40} {}", model.id, model.label),
                }
            }
        }
        Commands::Summarize {
            transcript,
            previous,
        } => {
            let messages: Vec<ConversationMessage> = read_json(&transcript)?;
            let previous: Option<ChatSummary> = previous.as_deref().map(read_json).transpose()?;

            let compactor = ContextCompactor::new(
                registry.clone(),
                Arc::new(ProviderRouter::with_default_adapters()),
                config.compaction_policy(),
            );
            let summary = compactor
                .compact(&messages, previous.as_ref(), &credentials)
                .await
                .context("Summarization failed")?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::TestKey { provider, api_key } => {
            let descriptor = registry.resolve(&provider)?;
            let prober = StatusProber::new(config.probe_config());
            let health = prober.test_api_key(&descriptor, &api_key, &credentials).await;

            println!(
                "{}: {} {}",
                health.provider,
                health.status.as_str(),
                health.message.as_deref().unwrap_or("")
            );
            if health.status == HealthStatus::Down {
                bail!("API key check failed for {}", provider);
            }
        }
        // Runs before the config is loaded.
        Commands::Init { .. } => {}
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

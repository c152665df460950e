use std::sync::Arc;

use super::claude::ClaudeProvider;
use super::descriptor::{ProviderDescriptor, API_KEY_PLACEHOLDER};
use super::gemini::GeminiProvider;
use super::openai::OpenAiProvider;
use super::traits::ModelFetcher;
use super::types::ApiFlavor;

pub const DEFAULT_PROVIDER: &str = "Anthropic";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Hosted providers plus the two common local OpenAI-compatible servers.
pub fn builtin_providers() -> Vec<ProviderDescriptor> {
    let claude: Arc<dyn ModelFetcher> = Arc::new(ClaudeProvider::new());
    let gemini: Arc<dyn ModelFetcher> = Arc::new(GeminiProvider::new());
    let openai: Arc<dyn ModelFetcher> = Arc::new(OpenAiProvider::new());

    vec![
        ProviderDescriptor::builder("OpenAI", ApiFlavor::OpenAiCompatible, "https://api.openai.com/v1")
            .bearer_auth()
            .api_key_env("OPENAI_API_KEY")
            .model("gpt-4o", "GPT-4o", 128_000)
            .model("gpt-4o-mini", "GPT-4o Mini", 128_000)
            .model("gpt-3.5-turbo", "GPT-3.5 Turbo", 16_385)
            .test_model("gpt-3.5-turbo")
            .dynamic_models(openai.clone())
            .status_page("https://status.openai.com/", true)
            .build(),
        ProviderDescriptor::builder("Anthropic", ApiFlavor::Anthropic, "https://api.anthropic.com/v1")
            .header("x-api-key", API_KEY_PLACEHOLDER)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .api_key_env("ANTHROPIC_API_KEY")
            .model("claude-3-5-sonnet-latest", "Claude 3.5 Sonnet", 200_000)
            .model("claude-3-5-haiku-latest", "Claude 3.5 Haiku", 200_000)
            .model("claude-3-opus-latest", "Claude 3 Opus", 200_000)
            .dynamic_models(claude)
            .status_page("https://status.anthropic.com/", true)
            .build(),
        ProviderDescriptor::builder(
            "Google",
            ApiFlavor::Gemini,
            "https://generativelanguage.googleapis.com/v1beta",
        )
        .header("x-goog-api-key", API_KEY_PLACEHOLDER)
        .api_key_env("GOOGLE_GENERATIVE_AI_API_KEY")
        .model("gemini-1.5-pro", "Gemini 1.5 Pro", 2_000_000)
        .model("gemini-1.5-flash", "Gemini 1.5 Flash", 1_000_000)
        .dynamic_models(gemini)
        .status_page("https://status.cloud.google.com/", true)
        .build(),
        ProviderDescriptor::builder(
            "Cohere",
            ApiFlavor::OpenAiCompatible,
            "https://api.cohere.ai/compatibility/v1",
        )
        .bearer_auth()
        .api_key_env("COHERE_API_KEY")
        .model("command-r-plus", "Command R+", 128_000)
        .model("command-r", "Command R", 128_000)
        .status_page("https://status.cohere.com/", false)
        .build(),
        ProviderDescriptor::builder(
            "HuggingFace",
            ApiFlavor::OpenAiCompatible,
            "https://router.huggingface.co/v1",
        )
        .bearer_auth()
        .api_key_env("HUGGINGFACE_API_KEY")
        .model(
            "mistralai/Mixtral-8x7B-Instruct-v0.1",
            "Mixtral 8x7B Instruct",
            32_768,
        )
        .model("Qwen/Qwen2.5-Coder-32B-Instruct", "Qwen 2.5 Coder 32B", 32_768)
        .status_page("https://status.huggingface.co/", true)
        .build(),
        ProviderDescriptor::builder("Mistral", ApiFlavor::OpenAiCompatible, "https://api.mistral.ai/v1")
            .bearer_auth()
            .api_key_env("MISTRAL_API_KEY")
            .model("mistral-large-latest", "Mistral Large", 128_000)
            .model("codestral-latest", "Codestral", 32_000)
            .model("mistral-tiny", "Mistral Tiny", 32_000)
            .test_model("mistral-tiny")
            .dynamic_models(openai.clone())
            .status_page("https://status.mistral.ai/", true)
            .build(),
        ProviderDescriptor::builder("Perplexity", ApiFlavor::OpenAiCompatible, "https://api.perplexity.ai")
            .bearer_auth()
            .api_key_env("PERPLEXITY_API_KEY")
            .model("sonar", "Sonar", 127_072)
            .model("sonar-pro", "Sonar Pro", 200_000)
            .status_page("https://status.perplexity.com/", true)
            .build(),
        ProviderDescriptor::builder("Together", ApiFlavor::OpenAiCompatible, "https://api.together.xyz/v1")
            .bearer_auth()
            .api_key_env("TOGETHER_API_KEY")
            .model(
                "mistralai/Mixtral-8x7B-Instruct-v0.1",
                "Mixtral 8x7B Instruct",
                32_768,
            )
            .model(
                "meta-llama/Llama-3.3-70B-Instruct-Turbo",
                "Llama 3.3 70B Instruct Turbo",
                131_072,
            )
            .dynamic_models(openai.clone())
            .status_page("https://status.together.ai/", true)
            .build(),
        ProviderDescriptor::builder(
            "AmazonBedrock",
            ApiFlavor::OpenAiCompatible,
            "https://bedrock-runtime.us-east-1.amazonaws.com/openai/v1",
        )
        // Bedrock API keys only. SigV4 credential bundles are not supported.
        .bearer_auth()
        .api_key_env("AWS_BEARER_TOKEN_BEDROCK")
        .model(
            "anthropic.claude-3-sonnet-20240229-v1:0",
            "Claude 3 Sonnet (Bedrock)",
            200_000,
        )
        .status_page("https://health.aws.amazon.com/health/status", true)
        .build(),
        ProviderDescriptor::builder("Groq", ApiFlavor::OpenAiCompatible, "https://api.groq.com/openai/v1")
            .bearer_auth()
            .api_key_env("GROQ_API_KEY")
            .model("llama-3.3-70b-versatile", "Llama 3.3 70B Versatile", 128_000)
            .model("mixtral-8x7b-32768", "Mixtral 8x7B", 32_768)
            .test_model("mixtral-8x7b-32768")
            .dynamic_models(openai.clone())
            .status_page("https://groqstatus.com/", true)
            .build(),
        ProviderDescriptor::builder("OpenRouter", ApiFlavor::OpenAiCompatible, "https://openrouter.ai/api/v1")
            .bearer_auth()
            .api_key_env("OPEN_ROUTER_API_KEY")
            .model("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet (OpenRouter)", 200_000)
            .test_model("anthropic/claude-3.5-sonnet")
            .dynamic_models(openai.clone())
            .status_page("https://status.openrouter.ai/", false)
            .build(),
        ProviderDescriptor::builder("XAI", ApiFlavor::OpenAiCompatible, "https://api.x.ai/v1")
            .bearer_auth()
            .api_key_env("XAI_API_KEY")
            .model("grok-beta", "Grok Beta", 131_072)
            .dynamic_models(openai.clone())
            .status_page("https://status.x.ai/", false)
            .build(),
        ProviderDescriptor::builder("Deepseek", ApiFlavor::OpenAiCompatible, "https://api.deepseek.com/v1")
            .bearer_auth()
            .api_key_env("DEEPSEEK_API_KEY")
            .model("deepseek-coder", "Deepseek Coder", 64_000)
            .model("deepseek-chat", "Deepseek Chat", 64_000)
            .test_model("deepseek-chat")
            .dynamic_models(openai.clone())
            .status_page("https://status.deepseek.com/", false)
            .build(),
        ProviderDescriptor::builder("LMStudio", ApiFlavor::OpenAiCompatible, "http://127.0.0.1:1234/v1")
            .api_key_env("LMSTUDIO_API_KEY")
            .dynamic_models(openai.clone())
            .build(),
        ProviderDescriptor::builder("Ollama", ApiFlavor::OpenAiCompatible, "http://127.0.0.1:11434/v1")
            .api_key_env("OLLAMA_API_KEY")
            .dynamic_models(openai)
            .build(),
    ]
}

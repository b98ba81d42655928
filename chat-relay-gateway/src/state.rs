use chat_relay_core::config::schema::ProviderConfig;
use chat_relay_providers::{LLMProvider, OpenAICompatClient};
use std::sync::Arc;

/// Fixed parameters of every upstream request
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&ProviderConfig> for CompletionSettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn LLMProvider>,
    pub settings: CompletionSettings,
}

impl AppState {
    pub fn new(provider: Arc<dyn LLMProvider>, settings: CompletionSettings) -> Self {
        Self { provider, settings }
    }

    /// State backed by the OpenAI-compatible client described by `config`
    pub fn from_config(config: &ProviderConfig) -> Self {
        let client = OpenAICompatClient::from_config(config);
        if !client.has_api_key() {
            tracing::warn!("No provider API key configured; upstream calls will likely fail");
        }
        Self::new(Arc::new(client), CompletionSettings::from(config))
    }
}

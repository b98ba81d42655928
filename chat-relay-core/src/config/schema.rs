//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for chat-relay
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Completion gateway (HTTP server) configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Upstream provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Terminal chat client configuration
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// HTTP server settings for the completion gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Directory holding the single-page app; `index.html` is the fallback document
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "public".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            static_dir: default_static_dir(),
        }
    }
}

/// Upstream completion provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds; transport defaults apply when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub extra_headers: Option<HashMap<String, String>>,
}

fn default_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: None,
            extra_headers: None,
        }
    }
}

/// Which session `restore` opens when history is not empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestoreSelection {
    /// First session in stored order
    #[default]
    First,
    /// Session with the latest message timestamp
    MostRecent,
}

/// Terminal chat client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the gateway API (the `/api` prefix included)
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Directory used as durable local storage
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Delay between revealed characters
    #[serde(default = "default_reveal_interval_ms")]
    pub reveal_interval_ms: u64,
    #[serde(default)]
    pub restore: RestoreSelection,
}

fn default_gateway_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_data_dir() -> String {
    "~/.chat-relay/data".to_string()
}

fn default_max_message_chars() -> usize {
    5000
}

fn default_reveal_interval_ms() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            data_dir: default_data_dir(),
            max_message_chars: default_max_message_chars(),
            reveal_interval_ms: default_reveal_interval_ms(),
            restore: RestoreSelection::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_hosted_setup() {
        let config = Config::default();
        assert_eq!(config.provider.model, "llama-3.3-70b-versatile");
        assert_eq!(config.provider.max_tokens, 1024);
        assert!((config.provider.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.client.max_message_chars, 5000);
        assert_eq!(config.client.reveal_interval_ms, 30);
        assert_eq!(config.client.restore, RestoreSelection::First);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"client":{"restore":"most_recent"}}"#).unwrap();
        assert_eq!(config.client.restore, RestoreSelection::MostRecent);
        assert_eq!(config.client.max_message_chars, 5000);
        assert_eq!(config.gateway.static_dir, "public");
    }
}

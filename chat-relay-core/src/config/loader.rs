//! Configuration loading and management
//!
//! Layers, lowest first: built-in defaults, `config.json`, alias variables
//! (`GROQ_API_KEY`, `PORT`), then `CHAT_RELAY__SECTION__KEY` paths.

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment prefix for path overrides, e.g. `CHAT_RELAY__GATEWAY__PORT=8080`
const ENV_PREFIX: &str = "CHAT_RELAY__";

const CONFIG_FILE: &str = "config.json";

/// Plain variables mapped onto config paths; `typed` values are parsed as JSON
struct Alias {
    var: &'static str,
    path: &'static [&'static str],
    typed: bool,
}

const ALIASES: &[Alias] = &[
    Alias {
        var: "GROQ_API_KEY",
        path: &["provider", "api_key"],
        typed: false,
    },
    Alias {
        var: "PORT",
        path: &["gateway", "port"],
        typed: true,
    },
];

/// Reads and writes `config.json` in one directory
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader for `~/.chat-relay`
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".chat-relay"))
            .unwrap_or_else(|| PathBuf::from(".chat-relay"));

        Self { config_dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and process environment
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_env(std::env::vars())
    }

    /// Load with an explicit set of environment variables
    pub fn load_with_env<I>(&self, vars: I) -> crate::Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layered = serde_json::to_value(Config::default())?;
        if let Some(file) = self.read_file_layer()? {
            overlay(&mut layered, file);
        }
        for (path, value) in env_overrides(vars) {
            set_path_value(&mut layered, &path, value);
        }

        let config: Config = serde_json::from_value(layered)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Write `config` as pretty JSON, creating the directory if needed.
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        crate::utils::ensure_dir(&self.config_dir)?;
        std::fs::write(self.config_path(), serde_json::to_string_pretty(config)?)?;
        Ok(())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn read_file_layer(&self) -> crate::Result<Option<Value>> {
        let path = self.config_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively lay `upper` over `base`; objects merge, anything else replaces.
fn overlay(base: &mut Value, upper: Value) {
    match (base, upper) {
        (Value::Object(base_map), Value::Object(upper_map)) => {
            for (key, value) in upper_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, upper) => *slot = upper,
    }
}

/// Config path overrides found in `vars`, aliases before prefixed paths so
/// the latter win.
fn env_overrides<I>(vars: I) -> Vec<(Vec<String>, Value)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut aliased = Vec::new();
    let mut prefixed = Vec::new();

    for (key, raw) in vars {
        if let Some(alias) = ALIASES.iter().find(|a| a.var == key) {
            let path = alias.path.iter().map(|s| s.to_string()).collect();
            let value = if alias.typed {
                parse_env_value(&raw)
            } else {
                Value::String(raw)
            };
            aliased.push((path, value));
        } else if let Some(suffix) = key.strip_prefix(ENV_PREFIX) {
            let path: Vec<String> = suffix
                .split("__")
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();
            if !path.is_empty() {
                prefixed.push((path, parse_env_value(&raw)));
            }
        }
    }

    aliased.extend(prefixed);
    aliased
}

/// JSON when it parses, otherwise the raw string
fn parse_env_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => {
                current = map
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
            _ => return,
        }
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RestoreSelection;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(Vec::new())
            .unwrap();

        assert_eq!(config.provider.model, "llama-3.3-70b-versatile");
        assert_eq!(config.provider.max_tokens, 1024);
        assert_eq!(config.gateway.port, 3000);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path().join("nested"));

        let mut config = Config::default();
        config.provider.model = "mixtral-8x7b-32768".to_string();
        config.client.restore = RestoreSelection::MostRecent;

        loader.save(&config).unwrap();
        assert!(loader.config_path().exists());
        assert_eq!(loader.config_path().parent(), Some(loader.config_dir()));

        let loaded = loader.load_with_env(Vec::new()).unwrap();
        assert_eq!(loaded.provider.model, "mixtral-8x7b-32768");
        assert_eq!(loaded.client.restore, RestoreSelection::MostRecent);
    }

    #[test]
    fn test_alias_variables() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(vars(&[("GROQ_API_KEY", "12345"), ("PORT", "8080")]))
            .unwrap();

        // The key stays a string even when it looks like a number.
        assert_eq!(config.provider.api_key, "12345");
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn test_path_override_beats_alias_and_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"provider":{"api_key":"gsk-file","model":"from-file"}}"#,
        )
        .unwrap();

        // Path override listed first to show ordering does not depend on it.
        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(vars(&[
                ("CHAT_RELAY__PROVIDER__API_KEY", "gsk-path"),
                ("GROQ_API_KEY", "gsk-alias"),
                ("CHAT_RELAY__CLIENT__REVEAL_INTERVAL_MS", "5"),
                ("UNRELATED", "x"),
            ]))
            .unwrap();

        assert_eq!(config.provider.api_key, "gsk-path");
        assert_eq!(config.provider.model, "from-file");
        assert_eq!(config.client.reveal_interval_ms, 5);
    }

    #[test]
    fn test_validation_rejects_invalid_temperature() {
        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(vars(&[("CHAT_RELAY__PROVIDER__TEMPERATURE", "2.5")]))
            .unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.json"), "{ nope").unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(Vec::new())
            .unwrap_err();
        assert!(matches!(err, crate::Error::Serialization(_)));
    }

    #[test]
    fn test_overlay_merges_objects_and_replaces_scalars() {
        let mut base = serde_json::json!({"a": {"x": 1, "y": 2}, "b": [1]});
        overlay(&mut base, serde_json::json!({"a": {"y": 3, "z": 4}, "b": "s"}));
        assert_eq!(
            base,
            serde_json::json!({"a": {"x": 1, "y": 3, "z": 4}, "b": "s"})
        );
    }

    #[test]
    fn test_set_path_value_creates_missing_objects() {
        let mut root = Value::Object(Map::new());
        set_path_value(
            &mut root,
            &["a".to_string(), "b".to_string()],
            Value::Bool(true),
        );
        assert_eq!(root["a"]["b"], Value::Bool(true));
    }
}

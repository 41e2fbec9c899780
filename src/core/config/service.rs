use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::ApiError;

/// Typed view over the merged `config.yml` + `secrets.yaml` documents.
///
/// Built once at process start and passed into every component constructor;
/// business logic never reads the environment directly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub rag: RagSettings,
    #[serde(default)]
    pub chat_history: ChatHistorySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagSettings {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Budget for the concatenated retrieved context, in characters.
    /// Truncation happens at whole-chunk granularity in result order.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatHistorySettings {
    /// How many recent turns are handed to the classifier and responders.
    #[serde(default = "default_history_limit")]
    pub default_limit: usize,
}

impl Default for ChatHistorySettings {
    fn default() -> Self {
        Self {
            default_limit: default_history_limit(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo-16k".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> i32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_collection() -> String {
    "dosu-bot".to_string()
}

fn default_top_k() -> usize {
    4
}

fn default_max_context_chars() -> usize {
    8000
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_history_limit() -> usize {
    20
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("DOSU_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads `config.yml`, overlays `secrets.yaml` (api keys live only
    /// there), validates, and deserializes into typed [`Settings`].
    pub fn load(&self) -> Result<Settings, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.paths.secrets_path);
        let merged = deep_merge(&public_config, &secrets_config);
        validate_config(&merged)?;
        serde_json::from_value(merged)
            .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(_) => Value::Object(Map::new()),
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_value(json!({})).unwrap();

        assert_eq!(settings.llm.chat_model, "gpt-3.5-turbo-16k");
        assert_eq!(settings.rag.top_k, 4);
        assert_eq!(settings.rag.collection, "dosu-bot");
        assert_eq!(settings.rag.chunk_size, 500);
        assert_eq!(settings.rag.chunk_overlap, 100);
        assert_eq!(settings.chat_history.default_limit, 20);
        assert!(settings.llm.api_key.is_none());
    }

    #[test]
    fn secrets_overlay_supplies_api_key() {
        let public_config = json!({
            "llm": { "chat_model": "gpt-4o-mini" }
        });
        let secrets = json!({
            "llm": { "api_key": "sk-test" }
        });

        let merged = deep_merge(&public_config, &secrets);
        let settings: Settings = serde_json::from_value(merged).unwrap();

        assert_eq!(settings.llm.chat_model, "gpt-4o-mini");
        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-test"));
    }
}

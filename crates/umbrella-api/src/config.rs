//! Server configuration: defaults, then an optional YAML file, then environment
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use umbrella_inference::DEFAULT_ENDPOINT;
use umbrella_prompts::ModelConfig;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_LOG_FILTER: &str = "info,umbrella=debug";

/// A 20 MB upload after base64 and JSON framing
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Names a YAML file to read before environment overrides
pub const CONFIG_PATH_VAR: &str = "UMBRELLA_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CONFIG/read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CONFIG/parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
    #[error("CONFIG/{key}: {detail}")]
    Invalid { key: &'static str, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub endpoint: String,
    /// Never written back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub inference: InferenceConfig,
    pub models: ModelConfig,
    /// Replacement prompt templates; the embedded set is used when unset
    pub prompts_path: Option<PathBuf>,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            inference: InferenceConfig::default(),
            models: ModelConfig::default(),
            prompts_path: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Assemble from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = match get(CONFIG_PATH_VAR) {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };

        if let Some(addr) = get("UMBRELLA_ADDR") {
            config.addr = addr;
        }
        if let Some(key) = get("GROQ_API_KEY") {
            config.inference.api_key = Some(key);
        }
        if let Some(endpoint) = get("UMBRELLA_INFERENCE_URL") {
            config.inference.endpoint = endpoint;
        }
        if let Some(model) = get("UMBRELLA_TEXT_MODEL") {
            config.models.text = model;
        }
        if let Some(model) = get("UMBRELLA_VISION_MODEL") {
            config.models.vision = model;
        }
        if let Some(model) = get("UMBRELLA_AUDIO_MODEL") {
            config.models.audio = model;
        }
        if let Some(model) = get("UMBRELLA_REVIEW_MODEL") {
            config.models.review = model;
        }
        if let Some(path) = get("UMBRELLA_PROMPTS") {
            config.prompts_path = Some(PathBuf::from(path));
        }
        if let Some(limit) = get("UMBRELLA_MAX_BODY_BYTES") {
            config.max_body_bytes = limit.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "UMBRELLA_MAX_BODY_BYTES",
                detail: format!("{limit:?}: {e}"),
            })?;
        }

        Ok(config)
    }

    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path,
            detail: e.to_string(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.inference.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8787");
        assert_eq!(config.inference.endpoint, DEFAULT_ENDPOINT);
        assert!(!config.has_api_key());
        assert_eq!(config.models, ModelConfig::default());
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_body_limit_override() {
        let config =
            ServerConfig::from_lookup(lookup(&[("UMBRELLA_MAX_BODY_BYTES", "1048576")])).unwrap();
        assert_eq!(config.max_body_bytes, 1024 * 1024);

        let err = ServerConfig::from_lookup(lookup(&[("UMBRELLA_MAX_BODY_BYTES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "UMBRELLA_MAX_BODY_BYTES", .. }));
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("UMBRELLA_ADDR", "127.0.0.1:9000"),
            ("GROQ_API_KEY", "gsk_test"),
            ("UMBRELLA_REVIEW_MODEL", "llama-3.3-70b-versatile"),
            ("UMBRELLA_TEXT_MODEL", "  "),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.inference.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.models.review, "llama-3.3-70b-versatile");
        assert_eq!(config.models.text, ModelConfig::default().text);
    }

    #[test]
    fn test_yaml_then_env() {
        let path = std::env::temp_dir().join(format!("umbrella-config-{}.yaml", std::process::id()));
        std::fs::write(
            &path,
            "addr: 127.0.0.1:7000\ninference:\n  endpoint: http://localhost:11434/v1/chat/completions\nmodels:\n  vision: llava\n",
        )
        .unwrap();

        let config = ServerConfig::from_lookup(lookup(&[
            (CONFIG_PATH_VAR, path.to_str().unwrap()),
            ("UMBRELLA_ADDR", "127.0.0.1:7001"),
        ]))
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.addr, "127.0.0.1:7001");
        assert_eq!(
            config.inference.endpoint,
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(config.models.vision, "llava");
        assert_eq!(config.models.audio, ModelConfig::default().audio);
    }

    #[test]
    fn test_missing_config_file() {
        let err = ServerConfig::from_lookup(lookup(&[(CONFIG_PATH_VAR, "/nonexistent/umbrella.yaml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = ServerConfig::default();
        config.inference.api_key = Some("secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret"));
    }
}

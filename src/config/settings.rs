//! Configuration settings for Reactor.

use crate::error::ReactorError;
use crate::template::ChatTemplate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub inference: InferenceSettings,
    pub agent: AgentSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Generation backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceProvider {
    /// Hosted text-generation-inference endpoint (Hugging Face style).
    #[default]
    Tgi,
    /// OpenAI-compatible completions endpoint.
    OpenAI,
}

impl std::str::FromStr for InferenceProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tgi" | "hf" | "huggingface" => Ok(InferenceProvider::Tgi),
            "openai" => Ok(InferenceProvider::OpenAI),
            _ => Err(format!("Unknown inference provider: {}", s)),
        }
    }
}

impl std::fmt::Display for InferenceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceProvider::Tgi => write!(f, "tgi"),
            InferenceProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    /// Backend used for text generation (tgi, openai).
    pub provider: InferenceProvider,
    /// Base URL of the inference API.
    pub base_url: String,
    /// Model identifier on the endpoint.
    pub model: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    /// File the token is read from when the environment variable is unset.
    pub token_file: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            provider: InferenceProvider::Tgi,
            base_url: "https://api-inference.huggingface.co".to_string(),
            model: "meta-llama/Llama-3.3-70B-Instruct".to_string(),
            token_env: "HF_TOKEN".to_string(),
            token_file: Some("~/.cache/huggingface/token".to_string()),
            timeout_secs: 300,
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Chat formatting convention the model was trained on.
    pub template: ChatTemplate,
    /// Token budget for each action step.
    pub max_tokens: u32,
    /// Token budget for the final answer.
    pub final_max_tokens: u32,
    /// Stop sequences that end an action step before the observation.
    pub stop_sequences: Vec<String>,
    /// Marker preceding the final answer in generated text.
    pub final_answer_marker: String,
    /// Number of action rounds before the final answer is forced.
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            template: ChatTemplate::Llama3,
            max_tokens: 200,
            final_max_tokens: 200,
            stop_sequences: vec!["Observation:".to_string()],
            final_answer_marker: "Final Answer:".to_string(),
            max_iterations: 1,
        }
    }
}

impl AgentSettings {
    /// Reject values the agent loop cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_iterations == 0 {
            return Err(ReactorError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_tokens == 0 || self.final_max_tokens == 0 {
            return Err(ReactorError::Config(
                "agent token budgets must be greater than zero".to_string(),
            ));
        }
        if self.stop_sequences.iter().any(|s| s.is_empty()) {
            return Err(ReactorError::Config(
                "agent.stop_sequences must not contain empty strings".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the agent or the backends cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.agent.validate()?;
        url::Url::parse(&self.inference.base_url).map_err(|e| {
            ReactorError::Config(format!(
                "inference.base_url '{}' is not a valid URL: {}",
                self.inference.base_url, e
            ))
        })?;
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReactorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reactor")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded token file path, if one is configured.
    pub fn token_file(&self) -> Option<PathBuf> {
        self.inference
            .token_file
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Self::expand_path)
    }
}

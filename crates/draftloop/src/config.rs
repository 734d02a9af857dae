//! Project configuration file support for draftloop.
//!
//! Loads configuration from `draftloop.toml` in the working directory and
//! merges it with command-line overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use draftloop_critic::{DEFAULT_CHAR_LIMIT, DEFAULT_REVISION_THRESHOLD};
use draftloop_llm::{
    GenerationConfig, ProviderType, DEFAULT_API_KEY_ENV, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};

/// Project-level configuration loaded from `draftloop.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Generation provider ("openai" or "ollama")
    pub provider: Option<String>,
    /// Global default model (applies to both writer and editor)
    pub model: Option<String>,
    /// Global default temperature
    pub temperature: Option<f32>,
    /// Chat completions endpoint override
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Stop once this many reviews have passed without approval
    pub revision_threshold: Option<usize>,
    /// Maximum draft length the editor enforces
    pub char_limit: Option<usize>,
    /// Writer-specific configuration
    #[serde(default)]
    pub writer: RoleConfig,
    /// Editor-specific configuration
    #[serde(default)]
    pub editor: RoleConfig,
}

/// Configuration for a specific role (writer or editor)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "draftloop.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Priority: [writer].model > global model > None
    pub fn writer_model(&self) -> Option<&str> {
        self.writer.model.as_deref().or(self.model.as_deref())
    }

    /// Priority: [writer].temperature > global temperature > None
    pub fn writer_temperature(&self) -> Option<f32> {
        self.writer.temperature.or(self.temperature)
    }

    /// Priority: [editor].model > global model > None
    pub fn editor_model(&self) -> Option<&str> {
        self.editor.model.as_deref().or(self.model.as_deref())
    }

    /// Priority: [editor].temperature > global temperature > None
    pub fn editor_temperature(&self) -> Option<f32> {
        self.editor.temperature.or(self.temperature)
    }
}

/// Values given on the command line; each wins over the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub provider: Option<ProviderType>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub revision_threshold: Option<usize>,
    pub char_limit: Option<usize>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub provider: ProviderType,
    pub writer: GenerationConfig,
    pub editor: GenerationConfig,
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub revision_threshold: usize,
    pub char_limit: usize,
}

impl RunSettings {
    /// Resolve settings. Priority: CLI > role table > global > built-in default
    pub fn resolve(overrides: &Overrides, config: &ProjectConfig) -> Result<Self> {
        let provider = match (overrides.provider, config.provider.as_deref()) {
            (Some(provider), _) => provider,
            (None, Some(name)) => name
                .parse::<ProviderType>()
                .map_err(|e| anyhow::anyhow!("{} in {}", e, CONFIG_FILE_NAME))?,
            (None, None) => ProviderType::OpenAi,
        };

        let writer = GenerationConfig::new(
            overrides
                .model
                .as_deref()
                .or(config.writer_model())
                .unwrap_or(DEFAULT_MODEL),
        )
        .with_temperature(
            overrides
                .temperature
                .or(config.writer_temperature())
                .unwrap_or(DEFAULT_TEMPERATURE),
        );

        let editor = GenerationConfig::new(
            overrides
                .model
                .as_deref()
                .or(config.editor_model())
                .unwrap_or(DEFAULT_MODEL),
        )
        .with_temperature(
            overrides
                .temperature
                .or(config.editor_temperature())
                .unwrap_or(DEFAULT_TEMPERATURE),
        );

        let char_limit = overrides
            .char_limit
            .or(config.char_limit)
            .unwrap_or(DEFAULT_CHAR_LIMIT);
        if char_limit == 0 {
            anyhow::bail!("char_limit must be greater than zero");
        }

        Ok(Self {
            provider,
            writer,
            editor,
            base_url: overrides.base_url.clone().or_else(|| config.base_url.clone()),
            api_key_env: overrides
                .api_key_env
                .clone()
                .or_else(|| config.api_key_env.clone())
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            revision_threshold: overrides
                .revision_threshold
                .or(config.revision_threshold)
                .unwrap_or(DEFAULT_REVISION_THRESHOLD),
            char_limit,
        })
    }
}

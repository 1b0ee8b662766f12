//! Configuration file management for weaver.
//!
//! Provides a TOML-based config file at `~/.config/weaver/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use weaver_core::assemble::TemplateStrategy;
use weaver_core::completion::OpenAiConfig;
use weaver_core::prompts::PromptLibrary;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub completion: CompletionSection,
    #[serde(default)]
    pub compose: ComposeSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompletionSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ComposeSection {
    /// "deterministic" or "generative".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateStrategy>,
    /// Directory of `<name>.txt` prompt overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the weaver config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/weaver` or `~/.config/weaver`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("weaver");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("weaver")
}

/// Return the path to the weaver config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Like [`load_config`], but a missing file is `None` rather than an error.
/// A file that exists and does not parse is still an error.
pub fn load_config_if_present() -> Result<Option<ConfigFile>> {
    if !config_path().exists() {
        return Ok(None);
    }
    load_config().map(Some)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file may hold an API key.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line, if any.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub template: Option<TemplateStrategy>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct WeaverConfig {
    pub completion: OpenAiConfig,
    pub template: TemplateStrategy,
    pub prompts_dir: Option<PathBuf>,
}

impl WeaverConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - API key: `OPENAI_API_KEY` > `completion.api_key` > none (calls fail as unavailable)
    /// - Model: `--model` > `OPENAI_MODEL` > `completion.model` > `OpenAiConfig::DEFAULT_MODEL`
    /// - Base URL: `OPENAI_BASE_URL` > `completion.base_url` > `OpenAiConfig::DEFAULT_BASE_URL`
    /// - Temperature: `OPENAI_TEMPERATURE` > `completion.temperature` > `OpenAiConfig::DEFAULT_TEMPERATURE`
    /// - Template: `--generative-template` > `compose.template` > deterministic
    /// - Prompts dir: `WEAVER_PROMPTS_DIR` > `compose.prompts_dir` > built-in templates only
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = load_config_if_present()?.unwrap_or_default();
        let defaults = OpenAiConfig::default();

        let api_key = env_var("OPENAI_API_KEY").or(file.completion.api_key);

        let model = cli
            .model
            .clone()
            .or_else(|| env_var("OPENAI_MODEL"))
            .or(file.completion.model)
            .unwrap_or(defaults.model);

        let base_url = env_var("OPENAI_BASE_URL")
            .or(file.completion.base_url)
            .unwrap_or(defaults.base_url);

        let temperature = match env_var("OPENAI_TEMPERATURE") {
            Some(raw) => raw
                .parse::<f32>()
                .with_context(|| format!("OPENAI_TEMPERATURE is not a number: {raw:?}"))?,
            None => file.completion.temperature.unwrap_or(defaults.temperature),
        };

        let timeout = file
            .completion
            .timeout_secs
            .map_or(defaults.timeout, Duration::from_secs);

        let template = cli
            .template
            .or(file.compose.template)
            .unwrap_or_default();

        let prompts_dir = env_var("WEAVER_PROMPTS_DIR")
            .map(PathBuf::from)
            .or(file.compose.prompts_dir);

        Ok(Self {
            completion: OpenAiConfig {
                api_key,
                model,
                base_url,
                temperature,
                timeout,
            },
            template,
            prompts_dir,
        })
    }

    /// Built-in templates, with overrides from the prompts dir if one is set.
    pub fn prompt_library(&self) -> Result<PromptLibrary> {
        match &self.prompts_dir {
            Some(dir) => PromptLibrary::with_overrides(dir)
                .with_context(|| format!("failed to load prompts from {}", dir.display())),
            None => Ok(PromptLibrary::builtin()),
        }
    }
}

/// A non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

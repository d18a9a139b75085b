//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ensemble-vote.toml` files.

use crate::agent::agent_loop::DEFAULT_SYSTEM_PROMPT;
use crate::cli::{OutputFormat, RunArgs};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".ensemble-vote.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Runner settings.
    #[serde(default)]
    pub runner: RunnerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Tool-calling iterations allowed per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    300
}

fn default_max_iterations() -> usize {
    15
}

/// Settings for the repeated runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// How many times to ask the question.
    #[serde(default = "default_runs")]
    pub runs: usize,

    /// Runs in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Instructions for the agent.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Offer the calculator tool to the agent.
    #[serde(default = "default_true")]
    pub enable_calculator: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            concurrency: default_concurrency(),
            system_prompt: default_system_prompt(),
            enable_calculator: true,
        }
    }
}

fn default_runs() -> usize {
    3
}

fn default_concurrency() -> usize {
    1
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.ensemble-vote.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with `run` arguments.
    ///
    /// Only values given explicitly on the command line (or via their
    /// environment variables) override the file.
    pub fn merge_with_args(&mut self, args: &RunArgs) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(max_iterations) = args.max_iterations {
            self.model.max_iterations = max_iterations;
        }

        if let Some(runs) = args.runs {
            self.runner.runs = runs;
        }
        if let Some(concurrency) = args.concurrency {
            self.runner.concurrency = concurrency;
        }
        if let Some(ref prompt) = args.system_prompt {
            self.runner.system_prompt = prompt.clone();
        }
        if args.no_tools {
            self.runner.enable_calculator = false;
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

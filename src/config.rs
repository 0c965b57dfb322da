use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::{
    ApiConfig, ClipsError, GenerationOptions, GenerationRequest, PollSettings, RenderingOptions,
    DEFAULT_BASE_URL,
};

/// Main configuration structure for Clipwatch
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Where the API lives and how to authenticate
    #[serde(default)]
    pub api: ApiSettings,
    /// Status checking behaviour
    #[serde(default)]
    pub polling: PollingConfig,
    /// What to ask the generator for
    #[serde(default)]
    pub generation: GenerationConfig,
    /// How the clips should be rendered
    #[serde(default)]
    pub rendering: RenderingConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiSettings {
    /// Base URL of the clips endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// How long to wait for the server to start answering
    #[serde(default = "default_response_timeout")]
    pub response_timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Seconds between status checks (and before retrying a connection)
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Consecutive connection failures tolerated; unset retries forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Natural language instructions for the clip generator
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Generation template (e.g. "moments")
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_num_generations")]
    pub num_generations: u32,
    #[serde(default)]
    pub min_duration_seconds: u32,
    #[serde(default = "default_max_duration")]
    pub max_duration_seconds: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RenderingConfig {
    /// Burn subtitles into the clip
    #[serde(default = "default_subtitles")]
    pub subtitles: bool,
    /// Output aspect ratio (e.g. "9:16")
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    String::from("REKA_API_KEY")
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_response_timeout() -> u64 {
    600
}

fn default_interval() -> u64 {
    30
}

fn default_prompt() -> String {
    String::from("Create an engaging video clip highlighting the best moments")
}

fn default_template() -> String {
    String::from("moments")
}

fn default_num_generations() -> u32 {
    1
}

fn default_max_duration() -> u32 {
    30
}

fn default_subtitles() -> bool {
    true
}

fn default_aspect_ratio() -> String {
    String::from("9:16")
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            connect_timeout_seconds: default_connect_timeout(),
            response_timeout_seconds: default_response_timeout(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            max_retries: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            template: default_template(),
            num_generations: default_num_generations(),
            min_duration_seconds: 0,
            max_duration_seconds: default_max_duration(),
        }
    }
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            subtitles: default_subtitles(),
            aspect_ratio: default_aspect_ratio(),
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clipwatch").join("config.toml"))
    }

    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Load the given file, else the default file when it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a TOML file
    ///
    /// # Arguments
    /// * `path` - Path where the configuration will be saved
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml).context("Failed to write config file")?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("API base URL is empty");
        }

        if self.api.api_key_env.trim().is_empty() {
            anyhow::bail!("API key environment variable name is empty");
        }

        if self.polling.interval_seconds == 0 {
            anyhow::bail!("Polling interval must be at least one second");
        }

        if self.generation.num_generations == 0 {
            anyhow::bail!("At least one generation must be requested");
        }

        if self.generation.min_duration_seconds > self.generation.max_duration_seconds {
            anyhow::bail!(
                "Minimum clip duration ({}s) exceeds maximum ({}s)",
                self.generation.min_duration_seconds,
                self.generation.max_duration_seconds
            );
        }

        Ok(())
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ClipsError> {
        api_key_from(&self.api.api_key_env, std::env::var(&self.api.api_key_env).ok())
    }

    /// Connection settings for the HTTP client
    pub fn api_config(&self, api_key: String) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            api_key,
            connect_timeout: Duration::from_secs(self.api.connect_timeout_seconds),
            response_timeout: Duration::from_secs(self.api.response_timeout_seconds),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.polling.interval_seconds),
            max_retries: self.polling.max_retries,
        }
    }

    /// Build the streaming generation request for one video
    pub fn generation_request(&self, video_url: &str) -> GenerationRequest {
        GenerationRequest {
            video_urls: vec![video_url.to_string()],
            prompt: self.generation.prompt.clone(),
            generation_config: GenerationOptions {
                template: self.generation.template.clone(),
                num_generations: self.generation.num_generations,
                min_duration_seconds: self.generation.min_duration_seconds,
                max_duration_seconds: self.generation.max_duration_seconds,
            },
            rendering_config: RenderingOptions {
                subtitles: self.rendering.subtitles,
                aspect_ratio: self.rendering.aspect_ratio.clone(),
            },
            stream: true,
        }
    }
}

/// An unset or blank variable counts as missing
fn api_key_from(var: &str, value: Option<String>) -> Result<String, ClipsError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ClipsError::AuthenticationMissing {
            var: var.to_string(),
        }),
    }
}

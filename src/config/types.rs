//! Configuration types for Easel
//!
//! Defines:
//! - `Settings` - Global application settings (.easel/config.toml)
//! - Per-section sub-types with serde defaults

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::preview::classify::{DEFAULT_ERROR_PATTERN, DEFAULT_SUCCESS_PATTERN};

/// Application settings (.easel/config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub sandbox: SandboxSettings,

    #[serde(default)]
    pub preview: PreviewSettings,

    #[serde(default)]
    pub behavior: BehaviorSettings,
}

/// Model endpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible chat-completions endpoint
    #[serde(default = "default_model_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key (never stored in the file)
    #[serde(default = "default_model_api_key_env")]
    pub api_key_env: String,

    /// Model name sent with each request
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_base: default_model_api_base(),
            api_key_env: default_model_api_key_env(),
            name: default_model_name(),
            temperature: 0.0,
        }
    }
}

fn default_model_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

/// Remote code-sandbox settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SandboxSettings {
    /// Base URL of the sandbox service
    #[serde(default = "default_sandbox_api_base")]
    pub api_base: String,

    /// Environment variable holding the sandbox API key
    #[serde(default = "default_sandbox_api_key_env")]
    pub api_key_env: String,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            api_base: default_sandbox_api_base(),
            api_key_env: default_sandbox_api_key_env(),
        }
    }
}

fn default_sandbox_api_base() -> String {
    "http://localhost:8080".to_string()
}

fn default_sandbox_api_key_env() -> String {
    "SANDBOX_API_KEY".to_string()
}

/// Component preview settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewSettings {
    /// File the rendered component is written to (relative to the workspace)
    #[serde(default = "default_page_file")]
    pub page_file: PathBuf,

    /// Port the serve process listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bounded wait per queue pop, in seconds
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Overall serve-phase startup timeout, in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Regex marking a line as a successful compile
    #[serde(default = "default_success_pattern")]
    pub success_pattern: String,

    /// Regex marking a line as a compile error
    #[serde(default = "default_error_pattern")]
    pub error_pattern: String,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            page_file: default_page_file(),
            port: default_port(),
            poll_timeout_secs: default_poll_timeout_secs(),
            startup_timeout_secs: default_startup_timeout_secs(),
            success_pattern: default_success_pattern(),
            error_pattern: default_error_pattern(),
        }
    }
}

fn default_page_file() -> PathBuf {
    PathBuf::from("app/page.tsx")
}

fn default_port() -> u16 {
    3000
}

fn default_poll_timeout_secs() -> u64 {
    5
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_success_pattern() -> String {
    DEFAULT_SUCCESS_PATTERN.to_string()
}

fn default_error_pattern() -> String {
    DEFAULT_ERROR_PATTERN.to_string()
}

/// Behavior settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BehaviorSettings {
    /// Maximum model round-trips per user turn
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_max_tool_iterations() -> usize {
    8
}

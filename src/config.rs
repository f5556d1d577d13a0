//! Configuration System
//!
//! Application settings for a dispatch run: backend endpoints, shared input files,
//! output root, HTTP timeouts, run policy and logging. Layered with the `config` crate
//! (defaults, global file, workspace file, environment). Per-job settings files are a
//! separate format, see [`crate::generation::settings`].

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend endpoints; one worker is started per entry
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Shared job inputs
    #[serde(default)]
    pub inputs: InputConfig,

    /// Output placement
    #[serde(default)]
    pub output: OutputConfig,

    /// Backend HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Run policy
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Seed, prompt and settings file locations (relative paths resolve against the workspace)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_seeds_file")]
    pub seeds_file: PathBuf,

    #[serde(default = "default_prompts_file")]
    pub prompts_file: PathBuf,

    /// Filename pattern for settings discovery; `*` matches any run of characters
    #[serde(default = "default_settings_pattern")]
    pub settings_pattern: String,
}

fn default_seeds_file() -> PathBuf {
    PathBuf::from("random_seeds.txt")
}

fn default_prompts_file() -> PathBuf {
    PathBuf::from("prompts.json")
}

fn default_settings_pattern() -> String {
    "settings_*.json".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            seeds_file: default_seeds_file(),
            prompts_file: default_prompts_file(),
            settings_pattern: default_settings_pattern(),
        }
    }
}

/// Where `generations_on_<model>` directories are created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

/// Per-request timeouts for backend calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Total timeout of one request; txt2img on large images is slow
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    600
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// What to do when a model's output root already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingOutputPolicy {
    /// Ask on the terminal
    Prompt,
    /// Append to the existing directory without asking
    Proceed,
    /// Skip jobs whose model root exists
    Skip,
}

impl Default for ExistingOutputPolicy {
    fn default() -> Self {
        ExistingOutputPolicy::Prompt
    }
}

/// Run policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Abort a job when its model cannot be selected (default: log and continue)
    #[serde(default)]
    pub strict_model_select: bool,

    #[serde(default)]
    pub existing_output: ExistingOutputPolicy,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Endpoint(String, String),
    Inputs(String),
    Http(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Endpoint(endpoint, msg) => {
                write!(f, "Endpoint '{}': {}", endpoint, msg)
            }
            ValidationError::Inputs(msg) => write!(f, "Inputs: {}", msg),
            ValidationError::Http(msg) => write!(f, "HTTP: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check that an endpoint looks like an http(s) base URI
pub fn validate_endpoint(endpoint: &str) -> Result<(), String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err("Endpoint cannot be empty".to_string());
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err("Endpoint must start with http:// or https://".to_string());
    }
    Ok(())
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for endpoint in &self.endpoints {
            if let Err(e) = validate_endpoint(endpoint) {
                errors.push(ValidationError::Endpoint(endpoint.clone(), e));
            }
        }

        if self.inputs.settings_pattern.trim().is_empty() {
            errors.push(ValidationError::Inputs(
                "Settings pattern cannot be empty".to_string(),
            ));
        }
        if self.inputs.seeds_file.as_os_str().is_empty() {
            errors.push(ValidationError::Inputs("Seeds file cannot be empty".to_string()));
        }
        if self.inputs.prompts_file.as_os_str().is_empty() {
            errors.push(ValidationError::Inputs(
                "Prompts file cannot be empty".to_string(),
            ));
        }

        if self.http.connect_timeout_secs == 0 || self.http.request_timeout_secs == 0 {
            errors.push(ValidationError::Http(
                "Timeouts must be greater than zero".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all errors into one `ApiError`
    pub fn validated(self) -> Result<Self, ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}

/// Resolve a possibly relative path against the workspace root
pub fn resolve_path(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

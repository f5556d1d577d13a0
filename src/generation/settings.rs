//! Job settings: one `settings_*.json` file describing a model and its generation parameters.

use crate::config::validate_endpoint;
use crate::error::JobError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One job configuration. Field aliases accept the older WebUI batch script names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    /// Backend base URI; replaced by the worker's endpoint at dispatch time
    #[serde(default, alias = "backend_api")]
    pub backend_endpoint: Option<String>,

    /// Checkpoint name as the backend knows it, e.g. `sdxl_base.safetensors`
    #[serde(default, alias = "model_name")]
    pub model_identifier: Option<String>,

    #[serde(default = "default_dimension")]
    pub width: u32,

    #[serde(default = "default_dimension")]
    pub height: u32,

    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f64,

    #[serde(default = "default_steps")]
    pub steps: u32,

    #[serde(default = "default_sampler")]
    pub sampler_name: String,

    #[serde(default)]
    pub negative_prompt: String,

    #[serde(
        default = "default_generations_per_prompt",
        alias = "number_of_generations_per_prompt"
    )]
    pub generations_per_prompt: u32,
}

fn default_dimension() -> u32 {
    1024
}

fn default_cfg_scale() -> f64 {
    7.0
}

fn default_steps() -> u32 {
    25
}

fn default_sampler() -> String {
    "DPM++ 2M Karras".to_string()
}

fn default_generations_per_prompt() -> u32 {
    1
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            backend_endpoint: None,
            model_identifier: None,
            width: default_dimension(),
            height: default_dimension(),
            cfg_scale: default_cfg_scale(),
            steps: default_steps(),
            sampler_name: default_sampler(),
            negative_prompt: String::new(),
            generations_per_prompt: default_generations_per_prompt(),
        }
    }
}

/// Parameters sent with every txt2img call of a job
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f64,
    pub steps: u32,
    pub sampler_name: String,
    pub negative_prompt: String,
}

impl JobSettings {
    /// Read and parse a settings file. Missing or malformed files are configuration errors.
    pub fn load(path: &Path) -> Result<Self, JobError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            JobError::Config(format!("Failed to read settings {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            JobError::Config(format!("Invalid settings {}: {}", path.display(), e))
        })
    }

    /// Same settings with the dispatcher's endpoint bound in
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.backend_endpoint = Some(endpoint.to_string());
        self
    }

    /// Required fields for a run: endpoint, model, at least one generation per prompt
    pub fn validate(&self) -> Result<(), JobError> {
        let endpoint = self
            .backend_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| JobError::Config("'backend_endpoint' must be provided".to_string()))?;
        validate_endpoint(endpoint)
            .map_err(|e| JobError::Config(format!("'backend_endpoint': {}", e)))?;

        self.model()?;

        if self.generations_per_prompt == 0 {
            return Err(JobError::Config(
                "'generations_per_prompt' must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The model identifier, or a configuration error when missing or blank
    pub fn model(&self) -> Result<&str, JobError> {
        self.model_identifier
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| JobError::Config("'model_identifier' must be provided".to_string()))
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            width: self.width,
            height: self.height,
            cfg_scale: self.cfg_scale,
            steps: self.steps,
            sampler_name: self.sampler_name.clone(),
            negative_prompt: self.negative_prompt.clone(),
        }
    }
}

//! Confirmation before writing into an existing model output directory.

use crate::config::ExistingOutputPolicy;
use crate::error::ApiError;
use std::path::Path;

/// Decides whether a job may append to an existing model root
pub trait OverwriteGate: Send + Sync {
    fn confirm(&self, model_root: &Path) -> Result<bool, ApiError>;
}

/// Asks on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveGate;

impl OverwriteGate for InteractiveGate {
    fn confirm(&self, model_root: &Path) -> Result<bool, ApiError> {
        use dialoguer::Confirm;
        Confirm::new()
            .with_prompt(format!(
                "Output directory '{}' already exists. Continue and add images to it?",
                model_root.display()
            ))
            .default(false)
            .interact()
            .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))
    }
}

/// Always proceeds
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl OverwriteGate for AssumeYes {
    fn confirm(&self, _model_root: &Path) -> Result<bool, ApiError> {
        Ok(true)
    }
}

/// Always declines, so jobs with existing output are skipped
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeNo;

impl OverwriteGate for AssumeNo {
    fn confirm(&self, _model_root: &Path) -> Result<bool, ApiError> {
        Ok(false)
    }
}

pub fn gate_for_policy(policy: ExistingOutputPolicy) -> Box<dyn OverwriteGate> {
    match policy {
        ExistingOutputPolicy::Prompt => Box::new(InteractiveGate),
        ExistingOutputPolicy::Proceed => Box::new(AssumeYes),
        ExistingOutputPolicy::Skip => Box::new(AssumeNo),
    }
}

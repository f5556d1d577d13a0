//! Config loader facade: the only entry point callers use to build an `AppConfig`.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::AppConfig;
use crate::error::ApiError;
use config::File;
use std::path::Path;

/// Loads `AppConfig` from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then global file, then workspace files, then environment.
    pub fn load(workspace_root: &Path) -> Result<AppConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validated()
    }

    /// Defaults, then the given file, then environment. Workspace and global files are ignored.
    pub fn load_from_file(path: &Path) -> Result<AppConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validated()
    }
}

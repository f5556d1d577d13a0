//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::backend::{BackendConnector, HttpConnector};
use crate::cli::parse::{Commands, OutputFormat, RunOptions};
use crate::cli::presentation::{format_dispatch_summary, format_outcome_text};
use crate::config::{resolve_path, validate_endpoint, AppConfig, ConfigLoader};
use crate::dispatch::{gate_for_policy, AssumeNo, AssumeYes, Dispatcher, JobStatus, OverwriteGate};
use crate::error::ApiError;
use crate::generation::{InputPaths, OutputLayout, RunnerPolicy};
use crate::seeds::write_seed_file;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Runtime context for CLI execution: workspace, loaded config and backend connector.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: AppConfig,
    connector: Arc<dyn BackendConnector>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config))
    }

    /// Context over an already loaded config, talking HTTP to real backends
    pub fn with_config(workspace_root: PathBuf, config: AppConfig) -> Self {
        let connector = Arc::new(HttpConnector::new(config.http.clone()));
        Self {
            workspace_root,
            config,
            connector,
        }
    }

    /// Replace the backend connector (used to inject test backends)
    pub fn with_connector(mut self, connector: Arc<dyn BackendConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Run {
                endpoints,
                settings,
                options,
                format,
            } => self.handle_run(endpoints, settings, options, *format),
            Commands::RunOne { settings, options } => self.handle_run_one(settings, options),
            Commands::Seeds {
                count,
                output,
                force,
            } => self.handle_seeds(*count, output, *force),
        }
    }

    fn handle_run(
        &self,
        endpoints: &[String],
        settings: &[PathBuf],
        options: &RunOptions,
        format: OutputFormat,
    ) -> Result<String, ApiError> {
        let endpoints = self.resolve_endpoints(endpoints)?;
        let settings_files = if settings.is_empty() {
            let pattern = &self.config.inputs.settings_pattern;
            let found = discover_settings_files(&self.workspace_root, pattern)?;
            if found.is_empty() {
                return Err(ApiError::ConfigError(format!(
                    "No settings files matching '{}' in {}",
                    pattern,
                    self.workspace_root.display()
                )));
            }
            found
        } else {
            settings
                .iter()
                .map(|p| resolve_path(&self.workspace_root, p))
                .collect()
        };
        debug!(files = settings_files.len(), "Settings files resolved");

        let dispatcher = self.build_dispatcher(options);
        let runtime = tokio::runtime::Runtime::new()?;
        let summary = runtime.block_on(dispatcher.run(&settings_files, &endpoints))?;

        let rendered = format_dispatch_summary(&summary, format)?;
        if summary.has_input_errors() {
            return Err(ApiError::RunFailed(rendered));
        }
        Ok(rendered)
    }

    fn handle_run_one(&self, settings: &Path, options: &RunOptions) -> Result<String, ApiError> {
        let settings_path = resolve_path(&self.workspace_root, settings);
        let dispatcher = self.build_dispatcher(options);
        let runtime = tokio::runtime::Runtime::new()?;
        let outcome = runtime.block_on(dispatcher.run_one(&settings_path))?;

        let rendered = format_outcome_text(&outcome).trim_start().to_string();
        match &outcome.status {
            JobStatus::Aborted(e) if e.is_input_error() => Err(ApiError::RunFailed(rendered)),
            _ => Ok(rendered),
        }
    }

    fn handle_seeds(&self, count: usize, output: &Path, force: bool) -> Result<String, ApiError> {
        let path = resolve_path(&self.workspace_root, output);
        let written = write_seed_file(&path, count, force)?;
        Ok(format!("Wrote {} seeds to {}", written, path.display()))
    }

    /// CLI endpoints win over config; every entry must be an http(s) URI
    fn resolve_endpoints(&self, cli_endpoints: &[String]) -> Result<Vec<String>, ApiError> {
        let endpoints = if cli_endpoints.is_empty() {
            self.config.endpoints.clone()
        } else {
            cli_endpoints.to_vec()
        };
        if endpoints.is_empty() {
            return Err(ApiError::ConfigError(
                "No backend endpoints configured (pass --endpoint or set `endpoints`)".to_string(),
            ));
        }
        for endpoint in &endpoints {
            validate_endpoint(endpoint)
                .map_err(|e| ApiError::ConfigError(format!("Endpoint '{}': {}", endpoint, e)))?;
        }
        Ok(endpoints)
    }

    fn gate(&self, options: &RunOptions) -> Box<dyn OverwriteGate> {
        if options.yes {
            Box::new(AssumeYes)
        } else if options.skip_existing {
            Box::new(AssumeNo)
        } else {
            gate_for_policy(self.config.policy.existing_output)
        }
    }

    fn build_dispatcher(&self, options: &RunOptions) -> Dispatcher {
        let inputs = &self.config.inputs;
        let input_paths = InputPaths {
            seeds_file: resolve_path(
                &self.workspace_root,
                options.seeds.as_deref().unwrap_or(inputs.seeds_file.as_path()),
            ),
            prompts_file: resolve_path(
                &self.workspace_root,
                options.prompts.as_deref().unwrap_or(inputs.prompts_file.as_path()),
            ),
        };
        let output_root = resolve_path(
            &self.workspace_root,
            options.output.as_deref().unwrap_or(self.config.output.root.as_path()),
        );
        info!(
            seeds = %input_paths.seeds_file.display(),
            prompts = %input_paths.prompts_file.display(),
            output = %output_root.display(),
            "Run inputs"
        );

        Dispatcher::new(
            Arc::clone(&self.connector),
            self.gate(options),
            input_paths,
            OutputLayout::new(output_root),
            RunnerPolicy {
                strict_model_select: self.config.policy.strict_model_select,
            },
        )
    }
}

/// Regex for a filename pattern where `*` matches any run of characters and `?` one
pub fn settings_pattern_regex(pattern: &str) -> Result<Regex, ApiError> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| {
        ApiError::ConfigError(format!("Invalid settings pattern '{}': {}", pattern, e))
    })
}

/// Files directly in `directory` whose name matches `pattern`, sorted by name
pub fn discover_settings_files(directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, ApiError> {
    let matcher = settings_pattern_regex(pattern)?;
    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let matches = entry
            .file_name()
            .to_str()
            .map(|name| matcher.is_match(name))
            .unwrap_or(false);
        if matches && entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

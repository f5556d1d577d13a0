//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
/// Later sources (global file, workspace file, environment) override these keys.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("endpoints", Vec::<String>::new())?
        .set_default("inputs.seeds_file", "random_seeds.txt")?
        .set_default("inputs.prompts_file", "prompts.json")?
        .set_default("inputs.settings_pattern", "settings_*.json")?
        .set_default("output.root", ".")?
        .set_default("http.connect_timeout_secs", 10)?
        .set_default("http.request_timeout_secs", 600)?
        .set_default("policy.strict_model_select", false)?
        .set_default("policy.existing_output", "prompt")
}

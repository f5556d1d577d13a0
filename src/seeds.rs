//! Seed file generator.
//!
//! Produces the newline separated pool read by [`crate::generation::SeedPool`]. Values
//! cover the range WebUI backends accept, `1..=2^32-1`.

use crate::error::ApiError;
use rand::Rng;
use std::path::Path;
use tracing::info;

pub const DEFAULT_SEED_COUNT: usize = 20_000;

pub const MAX_SEED: u64 = u32::MAX as u64;

pub fn random_seeds<R: Rng>(rng: &mut R, count: usize) -> Vec<u64> {
    (0..count).map(|_| rng.gen_range(1..=MAX_SEED)).collect()
}

/// Write `count` random seeds to `path`. An existing file is kept unless `force` is set.
pub fn write_seed_file(path: &Path, count: usize, force: bool) -> Result<usize, ApiError> {
    if count == 0 {
        return Err(ApiError::ConfigError(
            "Seed count must be greater than zero".to_string(),
        ));
    }
    if path.exists() && !force {
        return Err(ApiError::ConfigError(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }

    let seeds = random_seeds(&mut rand::thread_rng(), count);
    let content = seeds
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;

    info!(path = %path.display(), count, "Seed file written");
    Ok(count)
}

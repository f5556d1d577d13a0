//! Output placement: directory naming, running index allocation and per-directory locks.
//!
//! Layout: `<root>/generations_on_<model>/<prompt prefix>/image_<index>_seed_<seed>.png`.
//! The running index is not stored anywhere; it is recomputed from the filenames already
//! present in the directory, so runs append to earlier ones instead of overwriting them.

use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use walkdir::WalkDir;

/// Characters of the prompt used for its directory name
pub const PROMPT_PREFIX_CHARS: usize = 100;

/// Prefix of every model root directory
pub const MODEL_DIR_PREFIX: &str = "generations_on_";

static CHECKPOINT_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(?:safetensors|ckpt)(?:\s*\[[^\]]*\])?$").expect("valid regex")
});

static IMAGE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^image_(\d+)_seed_\d+").expect("valid regex"));

/// Keep alphanumerics, space, `_` and `-`; everything else becomes `_`.
pub fn sanitize_for_path(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Model identifier without its trailing checkpoint extension and optional ` [hash]`
pub fn model_stem(model_identifier: &str) -> &str {
    match CHECKPOINT_SUFFIX_RE.find(model_identifier) {
        Some(suffix) => &model_identifier[..suffix.start()],
        None => model_identifier,
    }
}

/// `generations_on_<sanitized model stem>`
pub fn model_directory_name(model_identifier: &str) -> String {
    format!(
        "{}{}",
        MODEL_DIR_PREFIX,
        sanitize_for_path(model_stem(model_identifier))
    )
}

/// Sanitized first 100 characters of the prompt
pub fn prompt_directory_name(prompt: &str) -> String {
    let prefix: String = prompt.chars().take(PROMPT_PREFIX_CHARS).collect();
    sanitize_for_path(&prefix)
}

pub fn image_file_name(index: u64, seed: u64) -> String {
    format!("image_{}_seed_{}.png", index, seed)
}

/// Running index encoded in an image filename, if the name follows the pattern
pub fn parse_image_index(file_name: &str) -> Option<u64> {
    IMAGE_NAME_RE
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Next `count` free running indices in `directory`: `max(existing) + 1 ..`.
///
/// Not atomic with the writes that follow; callers sharing a directory hold its
/// [`DirectoryLocks`] guard across allocation and writing.
pub fn next_indices(directory: &Path, count: usize) -> std::io::Result<Vec<u64>> {
    let mut base = 0u64;
    if directory.is_dir() {
        for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
            let entry = entry?;
            if let Some(index) = entry.file_name().to_str().and_then(parse_image_index) {
                base = base.max(index);
            }
        }
    }
    Ok((1..=count as u64).map(|offset| base + offset).collect())
}

/// Resolves output directories under a root
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding every prompt directory of one model
    pub fn model_root(&self, model_identifier: &str) -> PathBuf {
        self.root.join(model_directory_name(model_identifier))
    }

    pub fn prompt_dir(&self, model_identifier: &str, prompt: &str) -> PathBuf {
        self.model_root(model_identifier)
            .join(prompt_directory_name(prompt))
    }
}

/// Async locks keyed by canonical directory path, shared by all workers of a run
#[derive(Debug, Clone, Default)]
pub struct DirectoryLocks {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DirectoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `directory`. The directory should exist so that
    /// different spellings of the same path share one lock.
    pub async fn lock(&self, directory: &Path) -> tokio::sync::OwnedMutexGuard<()> {
        let key = dunce::canonicalize(directory).unwrap_or_else(|_| directory.to_path_buf());
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

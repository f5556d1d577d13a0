//! Per-job inputs: the seed pool and the prompt set, loaded fresh for every job.

use crate::error::LoadError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Ordered, finite pool of positive seeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPool {
    seeds: Vec<u64>,
}

impl SeedPool {
    /// Build a pool from already-validated seeds
    pub fn new(seeds: Vec<u64>) -> Self {
        Self { seeds }
    }

    /// Load a newline separated seed file. Blank lines are skipped.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = read_input(path)?;
        let pool = Self::parse(&content).map_err(|reason| LoadError::Malformed {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(pool)
    }

    fn parse(content: &str) -> Result<Self, String> {
        let mut seeds = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let seed: u64 = trimmed.parse().map_err(|_| {
                format!("line {}: '{}' is not a positive integer", line_no + 1, trimmed)
            })?;
            if seed == 0 {
                return Err(format!("line {}: seed must be positive", line_no + 1));
            }
            seeds.push(seed);
        }
        if seeds.is_empty() {
            return Err("seed file contains no seeds".to_string());
        }
        Ok(Self { seeds })
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// A fresh draw cursor at position 0
    pub fn cursor(&self) -> SeedCursor<'_> {
        SeedCursor {
            pool: self,
            position: 0,
        }
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.seeds
    }
}

/// Draw pointer into a `SeedPool`. Never wraps; `None` once the pool is exhausted.
#[derive(Debug)]
pub struct SeedCursor<'a> {
    pool: &'a SeedPool,
    position: usize,
}

impl SeedCursor<'_> {
    pub fn draw(&mut self) -> Option<u64> {
        let seed = self.pool.seeds.get(self.position).copied()?;
        self.position += 1;
        Some(seed)
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// Ordered prompts of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    prompts: Vec<String>,
}

#[derive(Deserialize)]
struct PromptFile {
    prompts: Vec<String>,
}

impl PromptSet {
    pub fn new(prompts: Vec<String>) -> Self {
        Self { prompts }
    }

    /// Load `{"prompts": [...]}`. Empty lists and empty prompts are rejected.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = read_input(path)?;
        let malformed = |reason: String| LoadError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let file: PromptFile =
            serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
        if file.prompts.is_empty() {
            return Err(malformed("prompt list is empty".to_string()));
        }
        if let Some(position) = file.prompts.iter().position(|p| p.trim().is_empty()) {
            return Err(malformed(format!("prompt {} is empty", position + 1)));
        }

        Ok(Self {
            prompts: file.prompts,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prompts.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

fn read_input(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Seed and prompt file locations shared by every job of a run
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub seeds_file: PathBuf,
    pub prompts_file: PathBuf,
}

impl InputPaths {
    /// Load both inputs; either failure aborts only the job asking for them
    pub fn load(&self) -> Result<(SeedPool, PromptSet), LoadError> {
        let seeds = SeedPool::load(&self.seeds_file)?;
        let prompts = PromptSet::load(&self.prompts_file)?;
        Ok((seeds, prompts))
    }
}

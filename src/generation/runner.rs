//! Job runner: one settings file against one backend.
//!
//! Selects the model, then walks every prompt with a fresh seed cursor, calling the
//! backend once per seed and appending the returned images to the prompt directory.
//! Generation and write failures are counted and skipped; only invalid settings (and,
//! in strict mode, a failed model switch) end the job early.

use crate::backend::{BackendClient, Txt2ImgRequest};
use crate::error::JobError;
use crate::generation::inputs::{PromptSet, SeedPool};
use crate::generation::output::{image_file_name, next_indices, DirectoryLocks, OutputLayout};
use crate::generation::settings::{GenerationParams, JobSettings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Runner behaviour knobs taken from the app config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerPolicy {
    /// Abort the job when the model switch fails
    pub strict_model_select: bool,
}

/// What a finished job did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    /// The backend confirmed the requested checkpoint
    pub model_selected: bool,
    pub generations_attempted: usize,
    pub generations_failed: usize,
    pub images_written: Vec<PathBuf>,
    /// Prompts that ran out of seeds before reaching `generations_per_prompt`
    pub exhausted_prompts: usize,
}

pub struct JobRunner<'a> {
    backend: &'a dyn BackendClient,
    layout: &'a OutputLayout,
    locks: &'a DirectoryLocks,
    policy: RunnerPolicy,
}

impl<'a> JobRunner<'a> {
    pub fn new(
        backend: &'a dyn BackendClient,
        layout: &'a OutputLayout,
        locks: &'a DirectoryLocks,
        policy: RunnerPolicy,
    ) -> Self {
        Self {
            backend,
            layout,
            locks,
            policy,
        }
    }

    /// Run every prompt × seed generation of one job
    pub async fn run(
        &self,
        settings: &JobSettings,
        seeds: &SeedPool,
        prompts: &PromptSet,
    ) -> Result<JobReport, JobError> {
        settings.validate()?;
        let model = settings.model()?;
        let endpoint = self.backend.endpoint();
        let mut report = JobReport::default();

        info!(
            endpoint = %endpoint,
            model = %model,
            prompts = prompts.len(),
            seeds = seeds.len(),
            generations_per_prompt = settings.generations_per_prompt,
            "Starting job"
        );

        match self.backend.select_model(model).await {
            Ok(selection) => report.model_selected = selection.confirmed(),
            Err(e) if self.policy.strict_model_select => {
                return Err(JobError::ModelSelect(e));
            }
            Err(e) => {
                warn!(
                    endpoint = %endpoint,
                    model = %model,
                    error = %e,
                    "Model selection failed, continuing with the active model"
                );
            }
        }

        let params = settings.params();
        for prompt in prompts.iter() {
            let directory = self.layout.prompt_dir(model, prompt);
            let mut cursor = seeds.cursor();

            for generation in 0..settings.generations_per_prompt {
                let Some(seed) = cursor.draw() else {
                    warn!(
                        endpoint = %endpoint,
                        prompt = %prompt,
                        requested = settings.generations_per_prompt,
                        completed = generation,
                        "Seeds exhausted, moving to the next prompt"
                    );
                    report.exhausted_prompts += 1;
                    break;
                };

                report.generations_attempted += 1;
                let written = &mut report.images_written;
                if let Err(reason) = self
                    .generate_one(&directory, prompt, seed, &params, written)
                    .await
                {
                    warn!(
                        endpoint = %endpoint,
                        prompt = %prompt,
                        seed,
                        error = %reason,
                        "Generation failed"
                    );
                    report.generations_failed += 1;
                }
            }
        }

        info!(
            endpoint = %endpoint,
            model = %model,
            attempted = report.generations_attempted,
            failed = report.generations_failed,
            images = report.images_written.len(),
            "Job finished"
        );
        Ok(report)
    }

    /// Paths are pushed to `written` as each file lands, so a failure part way through
    /// still accounts for the images already on disk.
    async fn generate_one(
        &self,
        directory: &Path,
        prompt: &str,
        seed: u64,
        params: &GenerationParams,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), String> {
        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|e| format!("cannot create {}: {}", directory.display(), e))?;

        let request = Txt2ImgRequest::new(prompt, seed, params);
        let images = self
            .backend
            .generate(&request)
            .await
            .map_err(|e| e.to_string())?;

        if images.is_empty() {
            warn!(seed, prompt = %prompt, "Backend returned no images");
            return Ok(());
        }

        // Held across allocation and writes so concurrent jobs get distinct indices
        let _guard = self.locks.lock(directory).await;
        let indices = next_indices(directory, images.len())
            .map_err(|e| format!("cannot scan {}: {}", directory.display(), e))?;
        write_images(directory, seed, indices, images, written).await
    }
}

async fn write_images(
    directory: &Path,
    seed: u64,
    indices: Vec<u64>,
    images: Vec<Vec<u8>>,
    written: &mut Vec<PathBuf>,
) -> Result<(), String> {
    for (index, bytes) in indices.into_iter().zip(images) {
        let path = directory.join(image_file_name(index, seed));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
        debug!(path = %path.display(), index, seed, "Image written");
        written.push(path);
    }
    Ok(())
}

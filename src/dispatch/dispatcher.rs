//! Dispatcher: pre-flight confirmation, worker pool and outcome collection.

use crate::backend::{BackendClient, BackendConnector};
use crate::dispatch::gate::OverwriteGate;
use crate::dispatch::queue::JobQueue;
use crate::error::{ApiError, BackendError, JobError};
use crate::generation::inputs::InputPaths;
use crate::generation::output::{DirectoryLocks, OutputLayout};
use crate::generation::runner::{JobReport, JobRunner, RunnerPolicy};
use crate::generation::settings::JobSettings;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Final state of one settings file
#[derive(Debug)]
pub enum JobStatus {
    Completed(JobReport),
    Aborted(JobError),
    Skipped(JobError),
}

#[derive(Debug)]
pub struct JobOutcome {
    pub settings_path: PathBuf,
    /// Endpoint of the worker that ran the job; `None` when it never reached a worker
    pub endpoint: Option<String>,
    pub status: JobStatus,
}

/// Outcomes of a dispatch, in input order
#[derive(Debug, Default)]
pub struct DispatchSummary {
    pub outcomes: Vec<JobOutcome>,
}

impl DispatchSummary {
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Completed(_)))
    }

    pub fn aborted(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Aborted(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Skipped(_)))
    }

    pub fn images_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match &o.status {
                JobStatus::Completed(report) => report.images_written.len(),
                _ => 0,
            })
            .sum()
    }

    /// Some job was aborted by bad settings or unreadable inputs
    pub fn has_input_errors(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(&o.status, JobStatus::Aborted(e) if e.is_input_error()))
    }

    fn count(&self, predicate: impl Fn(&JobStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}

/// State every worker needs to run a job
struct JobContext {
    inputs: InputPaths,
    layout: OutputLayout,
    locks: DirectoryLocks,
    policy: RunnerPolicy,
}

impl JobContext {
    async fn run_job(
        &self,
        backend: &dyn BackendClient,
        settings_path: &Path,
    ) -> Result<JobReport, JobError> {
        let settings = JobSettings::load(settings_path)?.with_endpoint(backend.endpoint());
        settings.validate()?;
        let (seeds, prompts) = self.inputs.load()?;
        JobRunner::new(backend, &self.layout, &self.locks, self.policy)
            .run(&settings, &seeds, &prompts)
            .await
    }
}

pub struct Dispatcher {
    connector: Arc<dyn BackendConnector>,
    gate: Box<dyn OverwriteGate>,
    context: Arc<JobContext>,
}

impl Dispatcher {
    pub fn new(
        connector: Arc<dyn BackendConnector>,
        gate: Box<dyn OverwriteGate>,
        inputs: InputPaths,
        layout: OutputLayout,
        policy: RunnerPolicy,
    ) -> Self {
        Self {
            connector,
            gate,
            context: Arc::new(JobContext {
                inputs,
                layout,
                locks: DirectoryLocks::new(),
                policy,
            }),
        }
    }

    /// Run every settings file on the endpoint pool and wait for all workers
    pub async fn run(
        &self,
        settings_files: &[PathBuf],
        endpoints: &[String],
    ) -> Result<DispatchSummary, ApiError> {
        if endpoints.is_empty() {
            return Err(ApiError::ConfigError(
                "No backend endpoints configured".to_string(),
            ));
        }

        let (queued, mut outcomes) = self.preflight(settings_files);
        info!(
            jobs = queued.len(),
            skipped = outcomes.len(),
            endpoints = endpoints.len(),
            "Dispatching jobs"
        );
        let queue = JobQueue::new(queued);

        let mut workers = Vec::with_capacity(endpoints.len());
        for (worker_id, endpoint) in endpoints.iter().enumerate() {
            let backend = match self.connector.connect(endpoint) {
                Ok(backend) => backend,
                Err(e) => {
                    error!(endpoint = %endpoint, error = %e, "Cannot create backend client");
                    continue;
                }
            };
            let queue = queue.clone();
            let context = Arc::clone(&self.context);
            workers.push(tokio::spawn(async move {
                Self::worker_loop(worker_id, backend, queue, context).await
            }));
        }

        for result in join_all(workers).await {
            match result {
                Ok(mut worker_outcomes) => outcomes.append(&mut worker_outcomes),
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }

        for settings_path in queue.drain().await {
            outcomes.push(JobOutcome {
                settings_path,
                endpoint: None,
                status: JobStatus::Aborted(JobError::Backend(BackendError::Unavailable(
                    "no backend worker was available".to_string(),
                ))),
            });
        }

        let order: HashMap<&Path, usize> = settings_files
            .iter()
            .enumerate()
            .map(|(position, path)| (path.as_path(), position))
            .collect();
        outcomes.sort_by_key(|o| order.get(o.settings_path.as_path()).copied());

        let summary = DispatchSummary { outcomes };
        info!(
            completed = summary.completed(),
            aborted = summary.aborted(),
            skipped = summary.skipped(),
            images = summary.images_written(),
            "Dispatch finished"
        );
        Ok(summary)
    }

    /// Run one settings file against the endpoint written in it
    pub async fn run_one(&self, settings_path: &Path) -> Result<JobOutcome, ApiError> {
        let settings = JobSettings::load(settings_path)?;
        settings.validate()?;
        let endpoint = settings.backend_endpoint.clone().unwrap_or_default();

        let (_, mut skipped) = self.preflight(&[settings_path.to_path_buf()]);
        if let Some(outcome) = skipped.pop() {
            return Ok(outcome);
        }

        let backend = self.connector.connect(&endpoint).map_err(JobError::from)?;
        let status = match self.context.run_job(backend.as_ref(), settings_path).await {
            Ok(report) => JobStatus::Completed(report),
            Err(e) => {
                warn!(settings = %settings_path.display(), error = %e, "Job aborted");
                JobStatus::Aborted(e)
            }
        };
        Ok(JobOutcome {
            settings_path: settings_path.to_path_buf(),
            endpoint: Some(endpoint),
            status,
        })
    }

    /// Ask the gate once per existing model root; returns the paths to queue and the
    /// outcomes of declined jobs.
    fn preflight(&self, settings_files: &[PathBuf]) -> (Vec<PathBuf>, Vec<JobOutcome>) {
        let mut decisions: HashMap<PathBuf, bool> = HashMap::new();
        let mut queued = Vec::new();
        let mut skipped = Vec::new();

        for path in settings_files {
            let model_root = JobSettings::load(path)
                .ok()
                .and_then(|s| s.model().ok().map(|m| self.context.layout.model_root(m)));

            let Some(model_root) = model_root.filter(|root| root.is_dir()) else {
                queued.push(path.clone());
                continue;
            };

            let proceed = match decisions.get(&model_root) {
                Some(decision) => *decision,
                None => {
                    let decision = self.gate.confirm(&model_root).unwrap_or_else(|e| {
                        warn!(error = %e, "Confirmation failed, treating as declined");
                        false
                    });
                    debug!(model_root = %model_root.display(), decision, "Existing output");
                    decisions.insert(model_root.clone(), decision);
                    decision
                }
            };

            if proceed {
                queued.push(path.clone());
            } else {
                info!(
                    settings = %path.display(),
                    model_root = %model_root.display(),
                    "Skipping job, existing output not confirmed"
                );
                skipped.push(JobOutcome {
                    settings_path: path.clone(),
                    endpoint: None,
                    status: JobStatus::Skipped(JobError::ConfirmationDeclined(model_root)),
                });
            }
        }

        (queued, skipped)
    }

    async fn worker_loop(
        worker_id: usize,
        backend: Arc<dyn BackendClient>,
        queue: JobQueue,
        context: Arc<JobContext>,
    ) -> Vec<JobOutcome> {
        let endpoint = backend.endpoint().to_string();
        debug!(worker_id, endpoint = %endpoint, "Worker started");

        let mut outcomes = Vec::new();
        while let Some(settings_path) = queue.try_pop().await {
            info!(
                worker_id,
                endpoint = %endpoint,
                settings = %settings_path.display(),
                "Processing settings file"
            );
            let status = match context.run_job(backend.as_ref(), &settings_path).await {
                Ok(report) => JobStatus::Completed(report),
                Err(e) => {
                    warn!(
                        endpoint = %endpoint,
                        settings = %settings_path.display(),
                        error = %e,
                        "Job aborted"
                    );
                    JobStatus::Aborted(e)
                }
            };
            outcomes.push(JobOutcome {
                settings_path,
                endpoint: Some(endpoint.clone()),
                status,
            });
        }

        debug!(worker_id, endpoint = %endpoint, jobs = outcomes.len(), "Worker stopped");
        outcomes
    }
}

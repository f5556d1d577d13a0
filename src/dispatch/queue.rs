//! Shared FIFO of settings files.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Work queue shared by every worker of one dispatch. Cloning shares the queue.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    inner: Arc<Mutex<VecDeque<PathBuf>>>,
}

impl JobQueue {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(paths.into_iter().collect())),
        }
    }

    /// Take the oldest path; `None` once drained. Never waits for new work.
    pub async fn try_pop(&self) -> Option<PathBuf> {
        self.inner.lock().await.pop_front()
    }

    /// Remove and return everything still queued
    pub async fn drain(&self) -> Vec<PathBuf> {
        self.inner.lock().await.drain(..).collect()
    }
}

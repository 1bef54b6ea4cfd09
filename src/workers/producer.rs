//! # ProducerWorker: appends a fixed batch of entries.
//!
//! Progress is kept across attempts, so a producer restarted after a store
//! outage resumes with the first entry it has not appended yet.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::log::Fields;
use crate::streams::Streams;

use super::worker::Worker;

/// Producer as a supervised [`Worker`].
pub struct ProducerWorker {
    name: String,
    streams: Arc<Streams>,
    batch: Vec<Fields>,
    interval: Option<Duration>,
    appended: AtomicUsize,
}

impl ProducerWorker {
    pub fn new(name: impl Into<String>, streams: Arc<Streams>, batch: Vec<Fields>) -> Self {
        Self {
            name: name.into(),
            streams,
            batch,
            interval: None,
            appended: AtomicUsize::new(0),
        }
    }

    /// Pause after every append.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of entries appended so far.
    pub fn appended(&self) -> usize {
        self.appended.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Worker for ProducerWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
        while let Some(fields) = self.batch.get(self.appended()) {
            if ctx.is_cancelled() {
                return Err(WorkerError::Canceled);
            }
            self.streams.append(fields.clone()).await?;
            self.appended.fetch_add(1, Ordering::AcqRel);

            if let Some(interval) = self.interval {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = ctx.cancelled() => return Err(WorkerError::Canceled),
                }
            }
        }
        Ok(())
    }
}

//! Global FIFO request queue
//!
//! One channel, one worker task. The worker awaits each job to full
//! completion before taking the next, so submission order is execution
//! order and at most one inference job touches the models at a time.
//! Only inference and preload are queued; cheap control operations are
//! answered directly by the dispatcher.

use crate::engine::ThreatEngine;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use urlguard_core::{Error, InferenceResult, Result};

enum QueueJob {
    Inference {
        url: String,
        models: Vec<String>,
        reply: oneshot::Sender<InferenceResult>,
    },
    Preload {
        models: Vec<String>,
        reply: oneshot::Sender<(Vec<String>, Vec<String>)>,
    },
}

/// Handle for submitting jobs to the single worker.
///
/// Cloneable; dropping every handle shuts the worker down once the
/// backlog drains.
#[derive(Clone)]
pub struct ScanQueue {
    tx: mpsc::UnboundedSender<QueueJob>,
}

impl ScanQueue {
    /// Spawn the worker task over `engine` and return the handle.
    pub fn start(engine: Arc<ThreatEngine>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueueJob>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    QueueJob::Inference { url, models, reply } => {
                        let result = engine.run_ensemble_inference(&url, &models).await;
                        // Receiver may have gone away; that only means the
                        // caller stopped waiting.
                        let _ = reply.send(result);
                    }
                    QueueJob::Preload { models, reply } => {
                        let outcome = engine.manager().preload(&models).await;
                        let _ = reply.send(outcome);
                    }
                }
            }
            info!("scan queue worker stopped");
        });
        debug!("scan queue worker started");
        Self { tx }
    }

    /// Enqueue an inference job; the receiver resolves when the worker
    /// has run it.
    pub fn submit_inference(
        &self,
        url: impl Into<String>,
        models: Vec<String>,
    ) -> Result<oneshot::Receiver<InferenceResult>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(QueueJob::Inference {
                url: url.into(),
                models,
                reply,
            })
            .map_err(|_| Error::internal("scan queue worker is gone"))?;
        Ok(rx)
    }

    /// Enqueue a preload job; resolves to (loaded, failed) model names.
    pub fn submit_preload(
        &self,
        models: Vec<String>,
    ) -> Result<oneshot::Receiver<(Vec<String>, Vec<String>)>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(QueueJob::Preload { models, reply })
            .map_err(|_| Error::internal("scan queue worker is gone"))?;
        Ok(rx)
    }
}

//! Model session manager
//!
//! Owns every loaded session for the process lifetime. Guarantees two
//! invariants callers rely on:
//!
//! - at most one load in flight per model name: concurrent callers await
//!   the same shared future, and a failed load clears its marker so a
//!   later call can retry;
//! - at most one execution in flight per model name: sessions are not
//!   reentrant, so a per-model async mutex is held across each run.

use crate::model_config::MlConfig;
use crate::session::{
    backend_name, resolve_device, CandleSession, InferenceSession, ModelInput, ModelOutput,
};
use candle_core::Device;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};
use urlguard_core::{ArtifactFetcher, Error, Result};

type LoadOutcome = std::result::Result<Arc<dyn InferenceSession>, Arc<Error>>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

pub struct ModelSessionManager {
    config: MlConfig,
    artifacts: Arc<dyn ArtifactFetcher>,
    device: Device,
    /// Loaded sessions, one per model name, for the process lifetime
    sessions: Mutex<HashMap<String, Arc<dyn InferenceSession>>>,
    /// In-flight loads, keyed by model name
    loading: Mutex<HashMap<String, SharedLoad>>,
    /// Per-model execution locks
    exec_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ModelSessionManager {
    /// Create a manager; the execution backend is resolved here, once.
    pub fn new(config: MlConfig, artifacts: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            config,
            artifacts,
            device: resolve_device(),
            sessions: Mutex::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
            exec_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Name of the resolved execution backend.
    pub fn backend(&self) -> &'static str {
        backend_name(&self.device)
    }

    /// Names of configured models.
    pub fn configured_models(&self) -> Vec<String> {
        self.config.models.keys().cloned().collect()
    }

    /// Whether a session for `name` is already cached.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.sessions.lock().contains_key(name)
    }

    /// Insert a prebuilt session. Seam for tests and host-supplied
    /// non-candle backends.
    pub fn register_session(&self, name: impl Into<String>, session: Arc<dyn InferenceSession>) {
        self.sessions.lock().insert(name.into(), session);
    }

    /// Get (loading if necessary) the session for `name`.
    ///
    /// A load already in flight for the same name is joined, never
    /// duplicated.
    pub async fn session(&self, name: &str) -> Result<Arc<dyn InferenceSession>> {
        if let Some(session) = self.sessions.lock().get(name).cloned() {
            return Ok(session);
        }

        let load = {
            let mut loading = self.loading.lock();
            if let Some(load) = loading.get(name) {
                load.clone()
            } else {
                let load = self.start_load(name)?;
                loading.insert(name.to_string(), load.clone());
                load
            }
        };

        let outcome = load.await;
        // Completed either way; clear the marker so a failed load can be
        // retried and a finished one stops pinning the future.
        self.loading.lock().remove(name);

        match outcome {
            Ok(session) => {
                self.sessions
                    .lock()
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::clone(&session));
                Ok(session)
            }
            Err(e) => Err(Error::model(format!("loading '{}' failed: {}", name, e))),
        }
    }

    fn start_load(&self, name: &str) -> Result<SharedLoad> {
        let spec = self
            .config
            .models
            .get(name)
            .ok_or_else(|| Error::model(format!("unknown model '{}'", name)))?
            .clone();
        let artifacts = Arc::clone(&self.artifacts);
        let device = self.device.clone();
        let name = name.to_string();

        info!(model = %name, artifact = %spec.artifact, "loading model");
        Ok(async move {
            let bytes = artifacts
                .fetch_bytes(&spec.artifact)
                .await
                .map_err(Arc::new)?;
            let session = CandleSession::from_bytes(&name, &spec, bytes, &device)
                .map(|s| Arc::new(s) as Arc<dyn InferenceSession>)
                .map_err(Arc::new)?;
            info!(model = %name, "model loaded");
            Ok(session)
        }
        .boxed()
        .shared())
    }

    /// Run one inference, holding the model's execution lock for the
    /// duration. This is the only execution path; callers reach it via
    /// the request queue.
    pub async fn run(&self, name: &str, input: ModelInput) -> Result<ModelOutput> {
        let session = self.session(name).await?;
        let lock = {
            let mut locks = self.exec_locks.lock();
            Arc::clone(
                locks
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let _running = lock.lock().await;
        session.run(input).await
    }

    /// Eagerly load `names`, logging failures without blocking the rest.
    /// Returns (loaded, failed).
    pub async fn preload(&self, names: &[String]) -> (Vec<String>, Vec<String>) {
        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for name in names {
            match self.session(name).await {
                Ok(_) => loaded.push(name.clone()),
                Err(e) => {
                    warn!(model = %name, error = %e, "preload failed");
                    failed.push(name.clone());
                }
            }
        }
        (loaded, failed)
    }
}

//! Request/response protocol over serde-JSON messages
//!
//! The hosting application speaks to the engine in `{type, id, payload}`
//! envelopes and gets `{type: result|error, id, payload}` back, matched
//! by id. Control messages (`ping`, `init`, `loadModel`) are answered
//! immediately; `inference` and `preloadModels` go through the FIFO
//! queue. A malformed or unknown request is an `error` response, never a
//! crash.

use crate::engine::ThreatEngine;
use crate::queue::ScanQueue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use urlguard_core::Error;

/// Inbound envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub payload: Value,
}

/// Outbound envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub payload: Value,
}

impl Response {
    fn result(id: &str, payload: Value) -> Self {
        Self {
            kind: "result".to_string(),
            id: id.to_string(),
            payload,
        }
    }

    fn error(id: &str, message: impl std::fmt::Display) -> Self {
        Self {
            kind: "error".to_string(),
            id: id.to_string(),
            payload: json!({ "message": message.to_string() }),
        }
    }
}

#[derive(Deserialize)]
struct InferencePayload {
    url: String,
    #[serde(default)]
    models: Vec<String>,
}

#[derive(Deserialize)]
struct LoadModelPayload {
    model: String,
}

#[derive(Deserialize)]
struct PreloadPayload {
    models: Vec<String>,
}

/// Routes decoded requests to the engine and queue.
pub struct Dispatcher {
    engine: Arc<ThreatEngine>,
    queue: ScanQueue,
}

impl Dispatcher {
    /// Build a dispatcher and start the queue worker.
    pub fn new(engine: Arc<ThreatEngine>) -> Self {
        let queue = ScanQueue::start(Arc::clone(&engine));
        Self { engine, queue }
    }

    /// Decode raw JSON and dispatch. Undecodable input gets an error
    /// response with an empty id, since no id could be read.
    pub async fn handle_raw(&self, raw: &str) -> Response {
        match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => Response::error("", format!("malformed request: {}", e)),
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        let id = request.id.clone();
        match request.kind.as_str() {
            "ping" => Response::result(&id, json!({ "pong": true })),
            "init" => self.handle_init(&id),
            "loadModel" => self.handle_load_model(&id, request.payload).await,
            "inference" => self.handle_inference(&id, request.payload).await,
            "preloadModels" => self.handle_preload(&id, request.payload).await,
            other => {
                warn!(kind = other, "unknown request type");
                Response::error(&id, format!("unknown request type '{}'", other))
            }
        }
    }

    /// Report capabilities and kick off the configured preload in the
    /// background; init itself never waits on model loads.
    fn handle_init(&self, id: &str) -> Response {
        let models = self.engine.default_models();
        match self.queue.submit_preload(self.engine.preload_set()) {
            // Reply receiver intentionally dropped; failures surface in
            // the worker's logs.
            Ok(_rx) => {}
            Err(e) => warn!(error = %e, "could not enqueue startup preload"),
        }
        Response::result(
            id,
            json!({
                "backend": self.engine.backend(),
                "models": models,
            }),
        )
    }

    async fn handle_load_model(&self, id: &str, payload: Value) -> Response {
        let payload: LoadModelPayload = match serde_json::from_value(payload) {
            Ok(p) => p,
            Err(e) => return Response::error(id, format!("bad loadModel payload: {}", e)),
        };
        match self.engine.manager().session(&payload.model).await {
            Ok(_) => Response::result(id, json!({ "model": payload.model, "loaded": true })),
            Err(e) => Response::error(id, e),
        }
    }

    async fn handle_inference(&self, id: &str, payload: Value) -> Response {
        let payload: InferencePayload = match serde_json::from_value(payload) {
            Ok(p) => p,
            Err(e) => return Response::error(id, format!("bad inference payload: {}", e)),
        };
        let models = if payload.models.is_empty() {
            self.engine.default_models()
        } else {
            payload.models
        };
        if let Some(unknown) = models.iter().find(|m| !self.engine.has_model(m)) {
            return Response::error(id, Error::model(format!("unknown model '{}'", unknown)));
        }

        let rx = match self.queue.submit_inference(payload.url, models) {
            Ok(rx) => rx,
            Err(e) => return Response::error(id, e),
        };
        match rx.await {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(value) => Response::result(id, value),
                Err(e) => Response::error(id, Error::from(e)),
            },
            Err(_) => Response::error(id, Error::internal("inference job was dropped")),
        }
    }

    async fn handle_preload(&self, id: &str, payload: Value) -> Response {
        let payload: PreloadPayload = match serde_json::from_value(payload) {
            Ok(p) => p,
            Err(e) => return Response::error(id, format!("bad preloadModels payload: {}", e)),
        };
        if let Some(unknown) = payload.models.iter().find(|m| !self.engine.has_model(m)) {
            return Response::error(id, Error::model(format!("unknown model '{}'", unknown)));
        }

        let rx = match self.queue.submit_preload(payload.models) {
            Ok(rx) => rx,
            Err(e) => return Response::error(id, e),
        };
        match rx.await {
            Ok((loaded, failed)) => {
                Response::result(id, json!({ "loaded": loaded, "failed": failed }))
            }
            Err(_) => Response::error(id, Error::internal("preload job was dropped")),
        }
    }
}

//! urlguard ML
//!
//! Ensemble model inference for URL threat scoring:
//! - Character-level tokenizer with host-supplied vocabulary
//! - Candle-backed model sessions behind the `InferenceSession` seam
//! - Session manager with load dedup and per-model execution locks
//! - Confidence-weighted ensemble combination
//! - `ThreatEngine` context, global FIFO scan queue, and the JSON
//!   request/response protocol the hosting application speaks

pub mod engine;
pub mod ensemble;
pub mod manager;
pub mod model_config;
pub mod protocol;
pub mod queue;
pub mod session;
pub mod tokenizer;

pub use engine::{EngineCapabilities, ScanReport, ThreatEngine};
pub use ensemble::EnsembleCombiner;
pub use manager::ModelSessionManager;
pub use model_config::{InputKind, MlConfig, ModelSpec, OutputKind, DEFAULT_MAX_LEN};
pub use protocol::{Dispatcher, Request, Response};
pub use queue::ScanQueue;
pub use session::{
    positive_probability, CandleSession, InferenceSession, ModelInput, ModelOutput,
};
pub use tokenizer::{CharTokenizer, TokenizedInput};

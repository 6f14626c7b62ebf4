//! urlguard Core
//!
//! Shared types, traits, and utilities for the urlguard edge
//! threat-scoring engine.
//!
//! This crate provides:
//! - Feature, prediction, and ensemble result types
//! - Error types and result handling
//! - Capability traits the hosting application implements (page
//!   inspection, network probe, threat intel, artifact/vocab resources)
//! - TLD extraction and risk tables

pub mod capabilities;
pub mod error;
pub mod tld;
pub mod types;

pub use capabilities::{
    ArtifactFetcher, FsArtifacts, FsVocab, NetworkProber, PageHandle, ThreatIntelSource,
    TieredIntel, VocabFetcher, VocabSource,
};
pub use error::{Error, Result};
pub use types::{
    DomFeatures, EnsembleScore, ExtractionTier, InferenceResult, LexicalFeatures,
    ModelPrediction, NetworkFeatures, ThreatIntelHit, UrlFeatures,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::capabilities::{
        ArtifactFetcher, NetworkProber, PageHandle, ThreatIntelSource, TieredIntel, VocabFetcher,
        VocabSource,
    };
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        DomFeatures, EnsembleScore, ExtractionTier, InferenceResult, LexicalFeatures,
        ModelPrediction, NetworkFeatures, ThreatIntelHit, UrlFeatures,
    };
}

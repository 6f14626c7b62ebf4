//! Common types shared across the scoring engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Extraction depth for a scan.
///
/// Tier 1 is pure string work and always runs. Tiers 2 and 3 require
/// external capabilities and degrade to absence when unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExtractionTier {
    /// URL text only, no I/O
    Lexical = 1,
    /// Lexical plus live-page inspection
    Dom = 2,
    /// Lexical, DOM, and a network probe
    Network = 3,
}

/// Features computed purely from the URL string.
///
/// Deterministic given the URL; produced synchronously with no I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalFeatures {
    pub url: String,
    pub length: usize,
    /// Shannon entropy over character frequencies of the full URL string
    pub entropy: f32,
    pub digit_ratio: f32,
    pub letter_ratio: f32,
    pub symbol_ratio: f32,
    /// Deduplicated 3-gram set, capped at 50 entries
    pub ngrams: Vec<String>,
    pub suspicious_keyword_count: usize,
    pub is_ip_address: bool,
    pub has_port: bool,
    pub is_https: bool,
    pub subdomain_count: usize,
    pub path_depth: usize,
    pub query_param_count: usize,
    pub fragment_length: usize,
    pub hostname_length: usize,
    pub path_length: usize,
    pub tld: String,
    /// Risk weight for the TLD, in [0, 1]
    pub tld_risk: f32,
}

/// Features produced by inspecting the rendered page (tier 2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomFeatures {
    pub form_count: usize,
    pub has_external_form_action: bool,
    pub password_input_count: usize,
    pub script_count: usize,
    pub external_script_count: usize,
    pub has_obfuscated_scripts: bool,
    pub iframe_count: usize,
    /// display:none, visibility:hidden, or under 10px in either dimension
    pub hidden_iframe_count: usize,
    /// Distinct external domains referenced by the page, capped at 20
    pub external_domains: Vec<String>,
    pub has_login_form: bool,
    pub has_social_login: bool,
    pub has_meta_refresh: bool,
    pub popup_count: usize,
}

/// Features from a bounded network probe (tier 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkFeatures {
    pub redirected: bool,
    pub final_url: String,
    pub tls_valid: bool,
    /// Best effort; false when undeterminable
    pub mixed_content: bool,
    pub response_time_ms: u64,
    /// 0 when the probe failed
    pub status_code: u16,
}

impl NetworkFeatures {
    /// Best-effort defaults used when the probe fails or times out.
    ///
    /// TLS validity falls back to "scheme is https" since nothing was
    /// observed on the wire.
    pub fn fallback(url: &str) -> Self {
        Self {
            redirected: false,
            final_url: url.to_string(),
            tls_valid: url.starts_with("https://"),
            mixed_content: false,
            response_time_ms: 0,
            status_code: 0,
        }
    }
}

/// A hit from the threat-intelligence lookup capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIntelHit {
    pub source: String,
    pub category: String,
    /// Severity in [0, 1]
    pub severity: f32,
}

/// Complete feature set for one scanned URL.
///
/// Created per scan call, immutable after construction, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlFeatures {
    pub url: String,
    pub lexical: LexicalFeatures,
    pub dom: Option<DomFeatures>,
    pub network: Option<NetworkFeatures>,
    pub threat_intel: Option<ThreatIntelHit>,
    pub tier: ExtractionTier,
    pub extraction_ms: u64,
}

/// Prediction from a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrediction {
    /// Positive-class probability in [0, 1]
    pub probability: f32,
    /// Binary label: 1 when probability > 0.5
    pub label: u8,
    /// Distance from the decision boundary: |p - 0.5| * 2
    pub confidence: f32,
    pub latency_ms: u64,
    pub model: String,
}

impl ModelPrediction {
    /// Build a prediction from a positive-class probability.
    pub fn from_probability(model: impl Into<String>, probability: f32, latency_ms: u64) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        Self {
            probability,
            label: if probability > 0.5 { 1 } else { 0 },
            confidence: (probability - 0.5).abs() * 2.0,
            latency_ms,
            model: model.into(),
        }
    }
}

/// Fused score from the ensemble combiner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleScore {
    pub probability: f32,
    pub confidence: f32,
}

impl EnsembleScore {
    /// Neutral, inconclusive result used when no model produced output.
    pub fn neutral() -> Self {
        Self {
            probability: 0.5,
            confidence: 0.0,
        }
    }
}

/// Result of running the model ensemble against one URL.
///
/// Models that failed to run are absent from `predictions`, not zeroed;
/// the ensemble fields are a pure function of the predictions present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    pub predictions: HashMap<String, ModelPrediction>,
    pub ensemble: EnsembleScore,
    pub total_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_from_probability() {
        let p = ModelPrediction::from_probability("m", 0.9, 3);
        assert_eq!(p.label, 1);
        assert!((p.confidence - 0.8).abs() < 1e-6);

        let p = ModelPrediction::from_probability("m", 0.5, 0);
        assert_eq!(p.label, 0);
        assert_eq!(p.confidence, 0.0);
    }

    #[test]
    fn test_prediction_probability_clamped() {
        let p = ModelPrediction::from_probability("m", 1.7, 0);
        assert_eq!(p.probability, 1.0);
        assert_eq!(p.confidence, 1.0);
    }

    #[test]
    fn test_neutral_ensemble() {
        let n = EnsembleScore::neutral();
        assert_eq!(n.probability, 0.5);
        assert_eq!(n.confidence, 0.0);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(ExtractionTier::Lexical < ExtractionTier::Dom);
        assert!(ExtractionTier::Dom < ExtractionTier::Network);
    }
}

//! Engine context: everything one scan needs, wired once at startup
//!
//! There are no globals; the dispatcher owns a `ThreatEngine` and hands
//! out references. A scan runs the heuristic matcher and the model
//! ensemble over the same extracted features and reports both verdicts
//! side by side.

use crate::ensemble::EnsembleCombiner;
use crate::manager::ModelSessionManager;
use crate::model_config::{InputKind, MlConfig};
use crate::session::{positive_probability, ModelInput};
use crate::tokenizer::CharTokenizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use urlguard_core::{
    ArtifactFetcher, ExtractionTier, InferenceResult, ModelPrediction, NetworkProber, Result,
    TieredIntel, UrlFeatures, VocabFetcher,
};
use urlguard_features::{to_feature_vector, FeatureExtractor};
use urlguard_patterns::{PatternConfig, PatternMatchResult, PatternMatcher};

/// Host-supplied capabilities the engine is built from.
pub struct EngineCapabilities {
    pub artifacts: Arc<dyn ArtifactFetcher>,
    pub vocab: Arc<dyn VocabFetcher>,
    pub prober: Option<Arc<dyn NetworkProber>>,
    pub intel: Arc<TieredIntel>,
}

/// One scan verdict: heuristics and ensemble, side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub url: String,
    pub features: UrlFeatures,
    /// Fixed 35-slot encoding of `features`, for hosts feeding their own
    /// paired models
    pub feature_vector: Vec<f32>,
    pub heuristics: PatternMatchResult,
    pub inference: InferenceResult,
}

/// Long-lived scan context.
pub struct ThreatEngine {
    extractor: FeatureExtractor,
    matcher: PatternMatcher,
    tokenizer: CharTokenizer,
    manager: Arc<ModelSessionManager>,
    combiner: EnsembleCombiner,
    ml_config: MlConfig,
}

impl ThreatEngine {
    /// Wire the engine from configuration and capabilities. The tokenizer
    /// vocabulary is fetched here; a fetch failure degrades to the
    /// built-in vocabulary rather than failing startup.
    pub async fn new(
        pattern_config: PatternConfig,
        ml_config: MlConfig,
        caps: EngineCapabilities,
    ) -> Result<Self> {
        ml_config.validate()?;
        let tokenizer = CharTokenizer::load(caps.vocab.as_ref(), &ml_config.vocab_resource).await;
        let manager = Arc::new(ModelSessionManager::new(ml_config.clone(), caps.artifacts));
        Ok(Self {
            extractor: FeatureExtractor::new(caps.prober, caps.intel),
            matcher: PatternMatcher::new(pattern_config)?,
            tokenizer,
            manager,
            combiner: EnsembleCombiner::new(ml_config.weights()),
            ml_config,
        })
    }

    pub fn manager(&self) -> &Arc<ModelSessionManager> {
        &self.manager
    }

    pub fn backend(&self) -> &'static str {
        self.manager.backend()
    }

    /// Models the engine will run by default: every configured model.
    pub fn default_models(&self) -> Vec<String> {
        let mut names = self.manager.configured_models();
        names.sort();
        names
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.ml_config.models.contains_key(name)
    }

    /// Models configured for eager loading at startup.
    pub fn preload_set(&self) -> Vec<String> {
        self.ml_config.preload.clone()
    }

    /// Full scan: features, heuristics, and ensemble inference. Never
    /// fails; degraded tiers and failed models show up as absences in the
    /// report.
    pub async fn scan(&self, url: &str, tier: ExtractionTier) -> ScanReport {
        let features = self.extractor.extract(url, tier, None).await;
        let heuristics = self.matcher.analyze(url);
        let inference = self.run_ensemble_inference(url, &self.default_models()).await;
        ScanReport {
            url: url.to_string(),
            feature_vector: to_feature_vector(&features).to_vec(),
            features,
            heuristics,
            inference,
        }
    }

    /// Run the named models over `url` and fuse their outputs.
    ///
    /// Models run one at a time; the execution backend is not reentrant
    /// across invocations. A model that fails to load or run is logged
    /// and left out of the prediction map; it is never zeroed into the
    /// ensemble. Zero surviving predictions produce the neutral score.
    pub async fn run_ensemble_inference(
        &self,
        url: &str,
        model_names: &[String],
    ) -> InferenceResult {
        let started = Instant::now();

        let mut predictions = Vec::with_capacity(model_names.len());
        for name in model_names {
            let Some(input) = self.build_input(name, url) else {
                warn!(model = %name, "model not configured; excluding from ensemble");
                continue;
            };
            let model_started = Instant::now();
            match self.manager.run(name, input).await {
                Ok(output) => {
                    let probability = positive_probability(&output);
                    predictions.push(ModelPrediction::from_probability(
                        name.clone(),
                        probability,
                        model_started.elapsed().as_millis() as u64,
                    ));
                }
                Err(e) => {
                    warn!(model = %name, error = %e, "model run failed; excluding from ensemble");
                }
            }
        }

        let ensemble = self.combiner.combine(&predictions);
        debug!(
            url,
            models = predictions.len(),
            probability = ensemble.probability,
            "ensemble inference complete"
        );

        InferenceResult {
            predictions: predictions
                .into_iter()
                .map(|p| (p.model.clone(), p))
                .collect::<HashMap<_, _>>(),
            ensemble,
            total_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Encode `url` the way the named model expects.
    fn build_input(&self, name: &str, url: &str) -> Option<ModelInput> {
        let spec = self.ml_config.models.get(name)?;
        Some(match spec.input {
            InputKind::Tokens { max_len, type_ids } => {
                ModelInput::from_tokens(self.tokenizer.tokenize(url, max_len), type_ids)
            }
            InputKind::Text => ModelInput::Text(url.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{InferenceSession, ModelOutput};
    use async_trait::async_trait;
    use urlguard_core::Error;
    use urlguard_features::FEATURE_VECTOR_LEN;

    struct NoArtifacts;

    #[async_trait]
    impl ArtifactFetcher for NoArtifacts {
        async fn fetch_bytes(&self, _filename: &str) -> Result<Vec<u8>> {
            Err(Error::capability("no artifact store in tests"))
        }
    }

    struct NoVocab;

    #[async_trait]
    impl VocabFetcher for NoVocab {
        async fn fetch_vocab(&self, _resource: &str) -> Result<urlguard_core::VocabSource> {
            Err(Error::capability("no vocab store in tests"))
        }
    }

    struct FixedSession {
        name: String,
        probability: f32,
    }

    #[async_trait]
    impl InferenceSession for FixedSession {
        async fn run(&self, _input: ModelInput) -> Result<ModelOutput> {
            Ok(ModelOutput::Probabilities(vec![
                1.0 - self.probability,
                self.probability,
            ]))
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct FailingSession(String);

    #[async_trait]
    impl InferenceSession for FailingSession {
        async fn run(&self, _input: ModelInput) -> Result<ModelOutput> {
            Err(Error::model("backend crashed"))
        }

        fn name(&self) -> &str {
            &self.0
        }
    }

    async fn engine() -> ThreatEngine {
        ThreatEngine::new(
            PatternConfig::default(),
            MlConfig::default(),
            EngineCapabilities {
                artifacts: Arc::new(NoArtifacts),
                vocab: Arc::new(NoVocab),
                prober: None,
                intel: Arc::new(TieredIntel::disabled()),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_failed_model_absent_not_zeroed() {
        let engine = engine().await;
        engine.manager().register_session(
            "url-transformer",
            Arc::new(FixedSession {
                name: "url-transformer".to_string(),
                probability: 0.8,
            }),
        );
        engine
            .manager()
            .register_session("phish-mlp", Arc::new(FailingSession("phish-mlp".to_string())));

        let result = engine
            .run_ensemble_inference(
                "https://example.com",
                &["url-transformer".to_string(), "phish-mlp".to_string()],
            )
            .await;

        assert_eq!(result.predictions.len(), 1);
        assert!(result.predictions.contains_key("url-transformer"));
        // The survivor's probability passes through untouched.
        assert!((result.ensemble.probability - 0.8).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_zero_models_is_neutral() {
        let engine = engine().await;
        let result = engine.run_ensemble_inference("https://example.com", &[]).await;
        assert!(result.predictions.is_empty());
        assert_eq!(result.ensemble.probability, 0.5);
        assert_eq!(result.ensemble.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_all_models_failing_is_neutral() {
        let engine = engine().await;
        // No sessions registered and no artifact store: every load fails.
        let result = engine
            .run_ensemble_inference("https://example.com", &engine.default_models())
            .await;
        assert!(result.predictions.is_empty());
        assert_eq!(result.ensemble.probability, 0.5);
    }

    #[tokio::test]
    async fn test_scan_reports_both_verdicts() {
        let engine = engine().await;
        engine.manager().register_session(
            "url-transformer",
            Arc::new(FixedSession {
                name: "url-transformer".to_string(),
                probability: 0.9,
            }),
        );
        engine.manager().register_session(
            "phish-mlp",
            Arc::new(FixedSession {
                name: "phish-mlp".to_string(),
                probability: 0.9,
            }),
        );

        let report = engine
            .scan("http://paypa1-secure-login.tk/verify", ExtractionTier::Lexical)
            .await;
        assert!(report.heuristics.score > 0.5);
        assert!(report.inference.ensemble.probability > 0.8);
        assert_eq!(report.features.lexical.tld, "tk");
        assert_eq!(report.feature_vector.len(), FEATURE_VECTOR_LEN);
    }
}

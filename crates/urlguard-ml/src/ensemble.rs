//! Confidence-weighted ensemble combination

use std::collections::HashMap;
use urlguard_core::{EnsembleScore, ModelPrediction};

/// Combines per-model predictions into one score.
///
/// Each prediction contributes `probability * weight * confidence`; the
/// weighted sum is normalized by the total effective weight. Ensemble
/// confidence rewards agreement between the two leading models.
pub struct EnsembleCombiner {
    weights: HashMap<String, f32>,
}

impl EnsembleCombiner {
    pub fn new(weights: HashMap<String, f32>) -> Self {
        Self { weights }
    }

    fn weight_of(&self, model: &str) -> f32 {
        self.weights.get(model).copied().unwrap_or(1.0)
    }

    /// Combine predictions into an ensemble score.
    ///
    /// No predictions yields the neutral score; a lone prediction passes
    /// through with its own confidence; zero total effective weight
    /// (every model at zero confidence) falls back to the plain mean.
    pub fn combine(&self, predictions: &[ModelPrediction]) -> EnsembleScore {
        if predictions.is_empty() {
            return EnsembleScore::neutral();
        }

        let mut weighted_sum = 0.0f32;
        let mut weight_total = 0.0f32;
        for pred in predictions {
            let effective = self.weight_of(&pred.model) * pred.confidence;
            weighted_sum += pred.probability * effective;
            weight_total += effective;
        }

        let probability = if weight_total > 0.0 {
            weighted_sum / weight_total
        } else {
            predictions.iter().map(|p| p.probability).sum::<f32>() / predictions.len() as f32
        };

        let confidence = match predictions {
            [only] => only.confidence,
            [first, second, ..] => {
                let agreement = 1.0 - (first.probability - second.probability).abs();
                let mean_conf = predictions.iter().map(|p| p.confidence).sum::<f32>()
                    / predictions.len() as f32;
                agreement * mean_conf
            }
            [] => unreachable!(),
        };

        EnsembleScore {
            probability: probability.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combiner() -> EnsembleCombiner {
        let mut weights = HashMap::new();
        weights.insert("url-transformer".to_string(), 0.60);
        weights.insert("phish-mlp".to_string(), 0.40);
        EnsembleCombiner::new(weights)
    }

    fn pred(model: &str, probability: f32) -> ModelPrediction {
        ModelPrediction::from_probability(model, probability, 1)
    }

    #[test]
    fn test_empty_is_neutral() {
        let score = combiner().combine(&[]);
        assert_eq!(score.probability, 0.5);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn test_single_prediction_passes_through() {
        let p = pred("url-transformer", 0.9);
        let score = combiner().combine(&[p.clone()]);
        assert!((score.probability - 0.9).abs() < 1e-6);
        assert!((score.confidence - p.confidence).abs() < 1e-6);
    }

    #[test]
    fn test_agreeing_models_average_with_high_confidence() {
        let score = combiner().combine(&[pred("url-transformer", 0.9), pred("phish-mlp", 0.9)]);
        assert!((score.probability - 0.9).abs() < 1e-5);
        // Full agreement: confidence equals the mean confidence (0.8).
        assert!((score.confidence - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_weighting_pulls_toward_heavier_model() {
        // Equal confidence (both |p - 0.5| * 2 = 0.6), so only the fixed
        // weights separate them: 0.6*0.8 + 0.4*0.2 = 0.56.
        let score = combiner().combine(&[pred("url-transformer", 0.8), pred("phish-mlp", 0.2)]);
        assert!((score.probability - 0.56).abs() < 1e-5);
        // Disagreement crushes confidence: (1 - 0.6) * 0.6 = 0.24.
        assert!((score.confidence - 0.24).abs() < 1e-5);
    }

    #[test]
    fn test_zero_confidence_falls_back_to_mean() {
        let score = combiner().combine(&[
            pred("url-transformer", 0.5),
            pred("phish-mlp", 0.5),
        ]);
        assert!((score.probability - 0.5).abs() < 1e-6);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn test_unknown_model_gets_unit_weight() {
        let score = combiner().combine(&[pred("other", 0.7)]);
        assert!((score.probability - 0.7).abs() < 1e-6);
    }
}

//! Typed configuration for models and ensemble weights
//!
//! Loaded once at startup and read-only afterwards. The ensemble weights
//! here pair with externally trained artifacts; they are fixed contract
//! values, not tuning knobs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use urlguard_core::{Error, Result};

/// Default sequence length for tokenizer-backed models.
pub const DEFAULT_MAX_LEN: usize = 128;

/// How a model consumes its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputKind {
    /// Tokenized ids + attention mask (+ optional zero-filled type ids)
    Tokens {
        #[serde(default = "default_max_len")]
        max_len: usize,
        #[serde(default)]
        type_ids: bool,
    },
    /// Raw URL text; the session encodes it internally
    Text,
}

fn default_max_len() -> usize {
    DEFAULT_MAX_LEN
}

impl Default for InputKind {
    fn default() -> Self {
        Self::Tokens {
            max_len: DEFAULT_MAX_LEN,
            type_ids: false,
        }
    }
}

/// How a model's raw output is decoded into a probability.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputKind {
    /// Raw logits; softmax-normalized before use
    #[default]
    Logits,
    /// Already-normalized class probabilities
    Probabilities,
    /// Label strings, mapped to a probability by substring match against
    /// the positive-class vocabulary as a last resort
    Labels { labels: Vec<String> },
}

/// Configuration for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Artifact filename passed to the artifact-fetch capability
    pub artifact: String,

    #[serde(default)]
    pub input: InputKind,

    #[serde(default)]
    pub output: OutputKind,

    /// Fixed ensemble weight
    #[serde(default = "default_weight")]
    pub weight: f32,

    /// Embedding table rows; must cover the tokenizer vocabulary
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,

    /// Hidden width of the classifier head
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
}

fn default_weight() -> f32 {
    1.0
}

fn default_vocab_size() -> usize {
    128
}

fn default_hidden_size() -> usize {
    64
}

/// Configuration for the whole inference subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    /// Model specs by name
    #[serde(default)]
    pub models: HashMap<String, ModelSpec>,

    /// Models loaded eagerly at startup
    #[serde(default)]
    pub preload: Vec<String>,

    /// Tokenizer vocabulary resource name
    #[serde(default = "default_vocab_resource")]
    pub vocab_resource: String,
}

fn default_vocab_resource() -> String {
    "url_vocab.txt".to_string()
}

impl Default for MlConfig {
    fn default() -> Self {
        let mut models = HashMap::new();
        models.insert(
            "url-transformer".to_string(),
            ModelSpec {
                artifact: "url_transformer.safetensors".to_string(),
                input: InputKind::Tokens {
                    max_len: DEFAULT_MAX_LEN,
                    type_ids: false,
                },
                output: OutputKind::Logits,
                weight: 0.60,
                vocab_size: 128,
                hidden_size: 64,
            },
        );
        models.insert(
            "phish-mlp".to_string(),
            ModelSpec {
                artifact: "phish_mlp.safetensors".to_string(),
                input: InputKind::Text,
                output: OutputKind::Logits,
                weight: 0.40,
                vocab_size: 128,
                hidden_size: 64,
            },
        );
        Self {
            models,
            preload: vec!["url-transformer".to_string()],
            vocab_resource: default_vocab_resource(),
        }
    }
}

impl MlConfig {
    /// Load from a YAML string and validate.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid ml config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file and validate.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    /// Validate shape at load time.
    pub fn validate(&self) -> Result<()> {
        for (name, spec) in &self.models {
            if spec.artifact.is_empty() {
                return Err(Error::config(format!("model '{}' has no artifact", name)));
            }
            if spec.weight < 0.0 {
                return Err(Error::config(format!(
                    "model '{}' weight {} is negative",
                    name, spec.weight
                )));
            }
            if let InputKind::Tokens { max_len, .. } = spec.input {
                if max_len < 2 {
                    return Err(Error::config(format!(
                        "model '{}' max_len {} leaves no room for CLS/SEP",
                        name, max_len
                    )));
                }
            }
        }
        for name in &self.preload {
            if !self.models.contains_key(name) {
                return Err(Error::config(format!(
                    "preload lists unknown model '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Ensemble weights by model name.
    pub fn weights(&self) -> HashMap<String, f32> {
        self.models
            .iter()
            .map(|(name, spec)| (name.clone(), spec.weight))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid_and_weighted() {
        let config = MlConfig::default();
        config.validate().unwrap();
        let weights = config.weights();
        assert_eq!(weights["url-transformer"], 0.60);
        assert_eq!(weights["phish-mlp"], 0.40);
    }

    #[test]
    fn test_yaml_loading() {
        let yaml = r#"
models:
  tiny:
    artifact: tiny.safetensors
    input:
      kind: tokens
      max_len: 64
    output:
      kind: probabilities
    weight: 1.0
preload: [tiny]
"#;
        let config = MlConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.models["tiny"].input,
            InputKind::Tokens { max_len: 64, .. }
        ));
        assert!(matches!(
            config.models["tiny"].output,
            OutputKind::Probabilities
        ));
    }

    #[test]
    fn test_unknown_preload_rejected() {
        let yaml = r#"
models:
  tiny:
    artifact: tiny.safetensors
preload: [missing]
"#;
        assert!(MlConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let yaml = r#"
models:
  tiny:
    artifact: tiny.safetensors
    weight: -0.5
"#;
        assert!(MlConfig::from_yaml(yaml).is_err());
    }
}

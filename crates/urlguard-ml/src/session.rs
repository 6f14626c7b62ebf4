//! Model sessions: candle-backed execution and output decoding
//!
//! A session is a loaded, stateful handle to one model artifact. Sessions
//! are owned exclusively by the [`ModelSessionManager`](crate::manager::ModelSessionManager)
//! and are never handed to callers; the trait exists so tests and plugins
//! can stand in for candle execution.

use crate::model_config::{InputKind, ModelSpec, OutputKind};
use crate::tokenizer::TokenizedInput;
use async_trait::async_trait;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{embedding, linear, Embedding, Linear, VarBuilder};
use tracing::info;
use urlguard_core::{Error, Result};

/// Label strings that decode to the positive (dangerous) class.
const POSITIVE_LABELS: &[&str] = &[
    "phish", "malicious", "unsafe", "fraud", "scam", "bad", "positive", "label_1",
];

/// Input handed to a session.
#[derive(Debug, Clone)]
pub enum ModelInput {
    /// Encoded tensors from the tokenizer
    Tokens {
        ids: Vec<u32>,
        mask: Vec<u32>,
        /// Zero-filled segment ids for models whose signature expects them
        type_ids: Option<Vec<u32>>,
    },
    /// Raw URL for string-input models
    Text(String),
}

impl ModelInput {
    /// Build token input from a tokenized URL per the model's spec.
    pub fn from_tokens(tokens: TokenizedInput, with_type_ids: bool) -> Self {
        let type_ids = with_type_ids.then(|| vec![0u32; tokens.input_ids.len()]);
        Self::Tokens {
            ids: tokens.input_ids,
            mask: tokens.attention_mask,
            type_ids,
        }
    }
}

/// Raw output of a session before decoding.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    /// Unnormalized class logits (index 1 = positive class)
    Logits(Vec<f32>),
    /// Normalized class probabilities
    Probabilities(Vec<f32>),
    /// A bare label string
    Label(String),
}

/// Executable model session. Implementations are not required to be
/// reentrant; the manager serializes calls per model.
#[async_trait]
pub trait InferenceSession: Send + Sync {
    async fn run(&self, input: ModelInput) -> Result<ModelOutput>;

    fn name(&self) -> &str;
}

/// Resolve the execution backend once, preferring hardware acceleration.
///
/// Decided at manager construction and fixed for the process lifetime.
pub fn resolve_device() -> Device {
    if let Ok(device) = Device::new_cuda(0) {
        info!("inference backend: cuda");
        return device;
    }
    if let Ok(device) = Device::new_metal(0) {
        info!("inference backend: metal");
        return device;
    }
    info!("inference backend: cpu");
    Device::Cpu
}

/// Short name of a device for diagnostics.
pub fn backend_name(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}

fn merr(e: candle_core::Error) -> Error {
    Error::model(e.to_string())
}

/// Embedding + masked mean pool + two-layer head producing 2 logits.
struct UrlClassifierNet {
    embedding: Embedding,
    hidden: Linear,
    output: Linear,
}

impl UrlClassifierNet {
    fn load(vb: &VarBuilder, vocab_size: usize, hidden_size: usize) -> Result<Self> {
        Ok(Self {
            embedding: embedding(vocab_size, hidden_size, vb.pp("embedding")).map_err(merr)?,
            hidden: linear(hidden_size, hidden_size, vb.pp("hidden")).map_err(merr)?,
            output: linear(hidden_size, 2, vb.pp("output")).map_err(merr)?,
        })
    }

    fn forward(&self, ids: &[u32], mask: &[u32], device: &Device) -> Result<Vec<f32>> {
        let seq = ids.len();
        let ids = Tensor::new(ids, device).map_err(merr)?.unsqueeze(0).map_err(merr)?;
        let mask_f: Vec<f32> = mask.iter().map(|&m| m as f32).collect();
        let content: f32 = mask_f.iter().sum::<f32>().max(1.0);
        let mask = Tensor::new(&mask_f[..], device)
            .map_err(merr)?
            .reshape((1, seq, 1))
            .map_err(merr)?;

        let embedded = self.embedding.forward(&ids).map_err(merr)?;
        let pooled = embedded
            .broadcast_mul(&mask)
            .map_err(merr)?
            .sum(1)
            .map_err(merr)?
            .affine(1.0 / content as f64, 0.0)
            .map_err(merr)?;

        let hidden = self.hidden.forward(&pooled).map_err(merr)?.relu().map_err(merr)?;
        let logits = self.output.forward(&hidden).map_err(merr)?;
        logits
            .squeeze(0)
            .map_err(merr)?
            .to_dtype(DType::F32)
            .map_err(merr)?
            .to_vec1::<f32>()
            .map_err(merr)
    }
}

/// Candle-backed session built from safetensors bytes.
pub struct CandleSession {
    name: String,
    net: UrlClassifierNet,
    device: Device,
    output: OutputKind,
    vocab_size: usize,
    text_len: usize,
}

impl CandleSession {
    /// Instantiate from raw artifact bytes on the resolved device.
    pub fn from_bytes(
        name: impl Into<String>,
        spec: &ModelSpec,
        bytes: Vec<u8>,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_buffered_safetensors(bytes, DType::F32, device).map_err(merr)?;
        let net = UrlClassifierNet::load(&vb, spec.vocab_size, spec.hidden_size)?;
        let text_len = match spec.input {
            InputKind::Tokens { max_len, .. } => max_len,
            InputKind::Text => crate::model_config::DEFAULT_MAX_LEN,
        };
        Ok(Self {
            name: name.into(),
            net,
            device: device.clone(),
            output: spec.output.clone(),
            vocab_size: spec.vocab_size,
            text_len,
        })
    }

    /// Byte-level encoding for string-input models: ids above the control
    /// range, fixed length, mask over real content.
    fn encode_text(&self, url: &str) -> (Vec<u32>, Vec<u32>) {
        let span = (self.vocab_size as u32).saturating_sub(4).max(1);
        let mut ids: Vec<u32> = url
            .to_lowercase()
            .bytes()
            .take(self.text_len)
            .map(|b| 4 + (b as u32 % span))
            .collect();
        let content = ids.len().max(1);
        ids.resize(self.text_len, 0);
        let mut mask = vec![1u32; content];
        mask.resize(self.text_len, 0);
        (ids, mask)
    }
}

#[async_trait]
impl InferenceSession for CandleSession {
    async fn run(&self, input: ModelInput) -> Result<ModelOutput> {
        let (ids, mask) = match input {
            ModelInput::Tokens { ids, mask, .. } => (ids, mask),
            ModelInput::Text(url) => self.encode_text(&url),
        };
        if ids.len() != mask.len() {
            return Err(Error::model(format!(
                "id/mask length mismatch: {} vs {}",
                ids.len(),
                mask.len()
            )));
        }
        let raw = self.net.forward(&ids, &mask, &self.device)?;
        Ok(match &self.output {
            OutputKind::Logits => ModelOutput::Logits(raw),
            OutputKind::Probabilities => ModelOutput::Probabilities(raw),
            OutputKind::Labels { labels } => {
                let argmax = raw
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                match labels.get(argmax) {
                    Some(label) => ModelOutput::Label(label.clone()),
                    None => ModelOutput::Logits(raw),
                }
            }
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Decode raw model output into a positive-class probability.
///
/// Logits are softmax-normalized; probability arrays are used directly;
/// label strings fall back to substring matching against the
/// positive-class vocabulary.
pub fn positive_probability(output: &ModelOutput) -> f32 {
    match output {
        ModelOutput::Logits(logits) => match logits.len() {
            0 => 0.5,
            1 => sigmoid(logits[0]),
            _ => softmax(logits)[1],
        },
        ModelOutput::Probabilities(probs) => match probs.len() {
            0 => 0.5,
            1 => probs[0].clamp(0.0, 1.0),
            _ => probs[1].clamp(0.0, 1.0),
        },
        ModelOutput::Label(label) => {
            let lower = label.to_lowercase();
            if POSITIVE_LABELS.iter().any(|p| lower.contains(p)) {
                0.9
            } else {
                0.1
            }
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_normalizes() {
        let probs = softmax(&[2.0, 1.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_decode_logits() {
        let p = positive_probability(&ModelOutput::Logits(vec![0.0, 0.0]));
        assert!((p - 0.5).abs() < 1e-6);

        let p = positive_probability(&ModelOutput::Logits(vec![-3.0, 3.0]));
        assert!(p > 0.95);
    }

    #[test]
    fn test_decode_probabilities_direct() {
        let p = positive_probability(&ModelOutput::Probabilities(vec![0.2, 0.8]));
        assert!((p - 0.8).abs() < 1e-6);

        let p = positive_probability(&ModelOutput::Probabilities(vec![0.7]));
        assert!((p - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_decode_labels_substring() {
        assert_eq!(
            positive_probability(&ModelOutput::Label("PHISHING".to_string())),
            0.9
        );
        assert_eq!(
            positive_probability(&ModelOutput::Label("benign".to_string())),
            0.1
        );
        assert_eq!(
            positive_probability(&ModelOutput::Label("LABEL_1".to_string())),
            0.9
        );
    }

    #[test]
    fn test_empty_output_is_neutral() {
        assert_eq!(positive_probability(&ModelOutput::Logits(vec![])), 0.5);
        assert_eq!(positive_probability(&ModelOutput::Probabilities(vec![])), 0.5);
    }

    #[test]
    fn test_token_input_with_type_ids() {
        let tokens = TokenizedInput {
            input_ids: vec![2, 5, 3, 0],
            attention_mask: vec![1, 1, 1, 0],
        };
        match ModelInput::from_tokens(tokens, true) {
            ModelInput::Tokens { type_ids, .. } => {
                assert_eq!(type_ids, Some(vec![0, 0, 0, 0]));
            }
            _ => panic!("expected token input"),
        }
    }
}

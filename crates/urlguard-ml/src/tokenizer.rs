//! Character-level URL tokenizer
//!
//! Encodes a URL into fixed-length id/attention-mask pairs for
//! transformer-style models. The vocabulary comes from a host-supplied
//! resource (token map or line list); if loading fails the tokenizer
//! falls back to a minimal built-in vocabulary so scoring stays
//! available.

use std::collections::HashMap;
use tracing::{info, warn};
use urlguard_core::{VocabFetcher, VocabSource};

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";

/// Characters covered by the fallback vocabulary: the URL alphabet.
const FALLBACK_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789-._~:/?#[]@!$&'()*+,;=%";

/// Fixed-length encoding of one URL.
///
/// Both vectors always have exactly the requested length; models never
/// see a shorter sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedInput {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

/// Character-to-id tokenizer with the usual CLS/SEP/PAD/UNK framing.
pub struct CharTokenizer {
    vocab: HashMap<char, u32>,
    pad_id: u32,
    unk_id: u32,
    cls_id: u32,
    sep_id: u32,
    vocab_size: u32,
}

impl CharTokenizer {
    /// Minimal built-in vocabulary: control tokens then the URL alphabet.
    pub fn fallback() -> Self {
        let mut vocab = HashMap::new();
        let mut next = 4u32;
        for ch in FALLBACK_ALPHABET.chars() {
            vocab.insert(ch, next);
            next += 1;
        }
        Self {
            vocab,
            pad_id: 0,
            unk_id: 1,
            cls_id: 2,
            sep_id: 3,
            vocab_size: next,
        }
    }

    /// Build from a loaded vocabulary resource.
    ///
    /// Control tokens are looked up by name; single-character tokens form
    /// the character map. Missing control tokens get the conventional
    /// low ids.
    pub fn from_source(source: VocabSource) -> Self {
        let entries: Vec<(String, u32)> = match source {
            VocabSource::Map(map) => map.into_iter().collect(),
            VocabSource::Lines(lines) => lines
                .into_iter()
                .enumerate()
                .map(|(i, tok)| (tok, i as u32))
                .collect(),
        };

        let mut vocab = HashMap::new();
        let mut pad_id = 0u32;
        let mut unk_id = 1u32;
        let mut cls_id = 2u32;
        let mut sep_id = 3u32;
        let mut max_id = 3u32;

        for (token, id) in entries {
            max_id = max_id.max(id);
            match token.as_str() {
                PAD_TOKEN => pad_id = id,
                UNK_TOKEN => unk_id = id,
                CLS_TOKEN => cls_id = id,
                SEP_TOKEN => sep_id = id,
                _ => {
                    let mut chars = token.chars();
                    if let (Some(ch), None) = (chars.next(), chars.next()) {
                        vocab.insert(ch, id);
                    }
                }
            }
        }

        Self {
            vocab,
            pad_id,
            unk_id,
            cls_id,
            sep_id,
            vocab_size: max_id + 1,
        }
    }

    /// Load the vocabulary resource, falling back to the built-in
    /// vocabulary on any failure.
    pub async fn load(fetcher: &dyn VocabFetcher, resource: &str) -> Self {
        match fetcher.fetch_vocab(resource).await {
            Ok(source) => {
                let tok = Self::from_source(source);
                info!(resource, vocab_size = tok.vocab_size, "loaded tokenizer vocabulary");
                tok
            }
            Err(e) => {
                warn!(resource, error = %e, "vocabulary load failed; using fallback vocabulary");
                Self::fallback()
            }
        }
    }

    pub fn vocab_size(&self) -> u32 {
        self.vocab_size
    }

    /// Encode a URL into exactly `max_len` ids plus an attention mask.
    ///
    /// Lowercases, strips the scheme and a leading "www.", maps each
    /// character (unknown characters to UNK), frames with CLS/SEP,
    /// truncates long input, and right-pads short input with PAD.
    pub fn tokenize(&self, url: &str, max_len: usize) -> TokenizedInput {
        // Room for CLS and SEP at minimum.
        let max_len = max_len.max(2);

        let lower = url.trim().to_lowercase();
        let stripped = match lower.find("://") {
            Some(idx) => &lower[idx + 3..],
            None => lower.as_str(),
        };
        let stripped = stripped.strip_prefix("www.").unwrap_or(stripped);

        let mut ids = Vec::with_capacity(max_len);
        ids.push(self.cls_id);
        for ch in stripped.chars() {
            ids.push(self.vocab.get(&ch).copied().unwrap_or(self.unk_id));
        }
        ids.truncate(max_len - 1);
        ids.push(self.sep_id);

        let content_len = ids.len();
        ids.resize(max_len, self.pad_id);

        let mut attention_mask = vec![1u32; content_len];
        attention_mask.resize(max_len, 0);

        TokenizedInput {
            input_ids: ids,
            attention_mask,
        }
    }
}

//! Capability traits supplied by the hosting application
//!
//! The scoring engine never talks to a page, the network, or a model
//! store directly. Everything outside pure computation arrives through
//! one of these seams, so the host decides how pages are inspected and
//! where model bytes come from, and tests can substitute fakes.

use crate::error::Result;
use crate::types::{DomFeatures, NetworkFeatures, ThreatIntelHit};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Handle onto a rendered page that can be inspected for DOM features.
///
/// Inspection may fail; callers treat failure as "tier unavailable".
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn inspect(&self) -> Result<DomFeatures>;
}

/// Bounded HEAD-style network probe.
#[async_trait]
pub trait NetworkProber: Send + Sync {
    /// Probe `url`, honoring `timeout_ms` as a hard deadline.
    async fn head_probe(&self, url: &str, timeout_ms: u64) -> Result<NetworkFeatures>;
}

/// Threat-intelligence lookup. Must fail soft: an error means "no answer",
/// never a failed scan.
#[async_trait]
pub trait ThreatIntelSource: Send + Sync {
    async fn lookup(&self, url: &str) -> Result<Option<ThreatIntelHit>>;
}

/// Two-tier threat-intel lookup: remote first, local cache fallback.
///
/// If both tiers fail the result is `None`; errors are logged and absorbed.
pub struct TieredIntel {
    remote: Option<Arc<dyn ThreatIntelSource>>,
    local: Option<Arc<dyn ThreatIntelSource>>,
}

impl TieredIntel {
    pub fn new(
        remote: Option<Arc<dyn ThreatIntelSource>>,
        local: Option<Arc<dyn ThreatIntelSource>>,
    ) -> Self {
        Self { remote, local }
    }

    /// A lookup with no backing sources; always returns `None`.
    pub fn disabled() -> Self {
        Self {
            remote: None,
            local: None,
        }
    }

    pub async fn lookup(&self, url: &str) -> Option<ThreatIntelHit> {
        if let Some(remote) = &self.remote {
            match remote.lookup(url).await {
                Ok(Some(hit)) => return Some(hit),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "remote threat-intel lookup failed"),
            }
        }
        if let Some(local) = &self.local {
            match local.lookup(url).await {
                Ok(hit) => return hit,
                Err(e) => warn!(error = %e, "local threat-intel lookup failed"),
            }
        }
        None
    }
}

/// Source of model artifact bytes, keyed by filename.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch_bytes(&self, filename: &str) -> Result<Vec<u8>>;
}

/// A vocabulary resource: either an explicit token-to-id map or a
/// line-delimited token list (ids assigned by position).
#[derive(Debug, Clone)]
pub enum VocabSource {
    Map(HashMap<String, u32>),
    Lines(Vec<String>),
}

/// Source of tokenizer vocabulary resources.
#[async_trait]
pub trait VocabFetcher: Send + Sync {
    async fn fetch_vocab(&self, resource: &str) -> Result<VocabSource>;
}

/// Filesystem-backed artifact fetcher for hosts that ship model files
/// alongside the binary.
pub struct FsArtifacts {
    dir: PathBuf,
}

impl FsArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactFetcher for FsArtifacts {
    async fn fetch_bytes(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(filename);
        Ok(tokio::fs::read(&path).await?)
    }
}

/// Filesystem-backed vocabulary fetcher. A `.json` resource is parsed as a
/// token-to-id map; anything else is read as a line-delimited token list.
pub struct FsVocab {
    dir: PathBuf,
}

impl FsVocab {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl VocabFetcher for FsVocab {
    async fn fetch_vocab(&self, resource: &str) -> Result<VocabSource> {
        let path = self.dir.join(resource);
        let raw = tokio::fs::read_to_string(&path).await?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let map: HashMap<String, u32> = serde_json::from_str(&raw)?;
            Ok(VocabSource::Map(map))
        } else {
            let lines = raw
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            Ok(VocabSource::Lines(lines))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    struct FailingIntel;

    #[async_trait]
    impl ThreatIntelSource for FailingIntel {
        async fn lookup(&self, _url: &str) -> Result<Option<ThreatIntelHit>> {
            Err(Error::capability("unreachable"))
        }
    }

    struct StaticIntel(Option<ThreatIntelHit>);

    #[async_trait]
    impl ThreatIntelSource for StaticIntel {
        async fn lookup(&self, _url: &str) -> Result<Option<ThreatIntelHit>> {
            Ok(self.0.clone())
        }
    }

    fn hit() -> ThreatIntelHit {
        ThreatIntelHit {
            source: "cache".to_string(),
            category: "phishing".to_string(),
            severity: 0.9,
        }
    }

    #[tokio::test]
    async fn test_tiered_intel_falls_back_to_local() {
        let intel = TieredIntel::new(
            Some(Arc::new(FailingIntel)),
            Some(Arc::new(StaticIntel(Some(hit())))),
        );
        let result = intel.lookup("https://example.com").await;
        assert_eq!(result.unwrap().source, "cache");
    }

    #[tokio::test]
    async fn test_tiered_intel_both_failing_is_none() {
        let intel = TieredIntel::new(Some(Arc::new(FailingIntel)), Some(Arc::new(FailingIntel)));
        assert!(intel.lookup("https://example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_tiered_intel_disabled() {
        assert!(TieredIntel::disabled().lookup("https://x.test").await.is_none());
    }

    #[tokio::test]
    async fn test_fs_vocab_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[PAD]\n[UNK]\na\nb").unwrap();

        let fetcher = FsVocab::new(dir.path());
        match fetcher.fetch_vocab("vocab.txt").await.unwrap() {
            VocabSource::Lines(lines) => assert_eq!(lines, vec!["[PAD]", "[UNK]", "a", "b"]),
            _ => panic!("expected line list"),
        }
    }

    #[tokio::test]
    async fn test_fs_vocab_map() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vocab.json"), r#"{"[PAD]":0,"a":4}"#).unwrap();

        let fetcher = FsVocab::new(dir.path());
        match fetcher.fetch_vocab("vocab.json").await.unwrap() {
            VocabSource::Map(map) => {
                assert_eq!(map["[PAD]"], 0);
                assert_eq!(map["a"], 4);
            }
            _ => panic!("expected map"),
        }
    }
}

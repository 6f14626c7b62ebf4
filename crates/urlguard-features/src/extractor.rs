//! Tiered feature extraction
//!
//! `extract` never fails. The lexical tier always runs; the DOM and
//! network tiers are attempted only when requested and available, and any
//! capability failure degrades to tier absence (or probe defaults) with a
//! warning rather than propagating.

use crate::lexical::extract_lexical;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use urlguard_core::{
    ExtractionTier, NetworkFeatures, NetworkProber, PageHandle, TieredIntel, UrlFeatures,
};

/// Hard deadline for the tier-3 network probe.
pub const PROBE_TIMEOUT_MS: u64 = 5_000;

/// Tiered feature collector.
///
/// Holds the long-lived capabilities (probe, threat intel); the page
/// handle is per-call since it belongs to one navigation.
pub struct FeatureExtractor {
    prober: Option<Arc<dyn NetworkProber>>,
    intel: Arc<TieredIntel>,
}

impl FeatureExtractor {
    pub fn new(prober: Option<Arc<dyn NetworkProber>>, intel: Arc<TieredIntel>) -> Self {
        Self { prober, intel }
    }

    /// A lexical-only extractor with no external capabilities.
    pub fn lexical_only() -> Self {
        Self {
            prober: None,
            intel: Arc::new(TieredIntel::disabled()),
        }
    }

    /// Extract features for `url` up to the requested tier.
    ///
    /// Unavailable tiers are `None` in the result, never an error. The
    /// reported tier reflects what was requested; consumers inspect the
    /// optional fields for what actually materialized.
    pub async fn extract(
        &self,
        url: &str,
        tier: ExtractionTier,
        page: Option<&dyn PageHandle>,
    ) -> UrlFeatures {
        let started = Instant::now();

        let lexical = extract_lexical(url);

        let dom = if tier >= ExtractionTier::Dom {
            match page {
                Some(handle) => match handle.inspect().await {
                    Ok(dom) => Some(dom),
                    Err(e) => {
                        warn!(url, error = %e, "page inspection failed; omitting DOM tier");
                        None
                    }
                },
                None => {
                    debug!(url, "DOM tier requested without a page handle");
                    None
                }
            }
        } else {
            None
        };

        let network = if tier >= ExtractionTier::Network {
            Some(self.probe(url).await)
        } else {
            None
        };

        let threat_intel = self.intel.lookup(url).await;

        UrlFeatures {
            url: url.to_string(),
            lexical,
            dom,
            network,
            threat_intel,
            tier,
            extraction_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// One bounded probe; failure and timeout both collapse to defaults.
    async fn probe(&self, url: &str) -> NetworkFeatures {
        let Some(prober) = &self.prober else {
            return NetworkFeatures::fallback(url);
        };
        match prober.head_probe(url, PROBE_TIMEOUT_MS).await {
            Ok(net) => net,
            Err(e) => {
                warn!(url, error = %e, "network probe failed; using defaults");
                NetworkFeatures::fallback(url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use urlguard_core::{DomFeatures, Error, Result};

    struct StaticPage(DomFeatures);

    #[async_trait]
    impl PageHandle for StaticPage {
        async fn inspect(&self) -> Result<DomFeatures> {
            Ok(self.0.clone())
        }
    }

    struct BrokenPage;

    #[async_trait]
    impl PageHandle for BrokenPage {
        async fn inspect(&self) -> Result<DomFeatures> {
            Err(Error::capability("page gone"))
        }
    }

    struct SlowProber;

    #[async_trait]
    impl NetworkProber for SlowProber {
        async fn head_probe(&self, _url: &str, _timeout_ms: u64) -> Result<NetworkFeatures> {
            Err(Error::Timeout)
        }
    }

    #[tokio::test]
    async fn test_lexical_tier_has_no_optional_tiers() {
        let extractor = FeatureExtractor::lexical_only();
        let f = extractor
            .extract("https://example.com/a", ExtractionTier::Lexical, None)
            .await;
        assert!(f.dom.is_none());
        assert!(f.network.is_none());
        assert_eq!(f.tier, ExtractionTier::Lexical);
    }

    #[tokio::test]
    async fn test_dom_tier_with_handle() {
        let extractor = FeatureExtractor::lexical_only();
        let page = StaticPage(DomFeatures {
            form_count: 1,
            has_login_form: true,
            ..Default::default()
        });
        let f = extractor
            .extract("https://example.com/login", ExtractionTier::Dom, Some(&page))
            .await;
        assert!(f.dom.as_ref().is_some_and(|d| d.has_login_form));
    }

    #[tokio::test]
    async fn test_inspection_failure_omits_tier() {
        let extractor = FeatureExtractor::lexical_only();
        let f = extractor
            .extract("https://example.com/", ExtractionTier::Dom, Some(&BrokenPage))
            .await;
        assert!(f.dom.is_none());
    }

    #[tokio::test]
    async fn test_probe_failure_yields_defaults() {
        let extractor = FeatureExtractor::new(
            Some(Arc::new(SlowProber)),
            Arc::new(TieredIntel::disabled()),
        );
        let f = extractor
            .extract("https://example.com/x", ExtractionTier::Network, None)
            .await;
        let net = f.network.expect("network tier should hold defaults");
        assert_eq!(net.status_code, 0);
        assert!(!net.redirected);
        assert!(net.tls_valid);
        assert_eq!(net.final_url, "https://example.com/x");
    }

    #[tokio::test]
    async fn test_http_scheme_defaults_not_tls_valid() {
        let extractor = FeatureExtractor::new(
            Some(Arc::new(SlowProber)),
            Arc::new(TieredIntel::disabled()),
        );
        let f = extractor
            .extract("http://example.com/x", ExtractionTier::Network, None)
            .await;
        assert!(!f.network.unwrap().tls_valid);
    }
}

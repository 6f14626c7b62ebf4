//! Fixed-length feature vector encoding
//!
//! The slot order and normalization divisors below are a contract with
//! any paired trained model: changing either silently breaks inference.
//! Absent tiers are zero-filled, they never shift later slots.

use url::Url;
use urlguard_core::UrlFeatures;

/// Total vector width: 17 lexical + 10 DOM + 6 network + 2 threat-intel.
pub const FEATURE_VECTOR_LEN: usize = 35;

/// First DOM slot (slots 17..=26 are zero when the DOM tier is absent).
pub const DOM_OFFSET: usize = 17;

/// First network slot (slots 27..=32 are zero when the network tier is absent).
pub const NETWORK_OFFSET: usize = 27;

/// First threat-intel slot.
pub const INTEL_OFFSET: usize = 33;

fn norm(value: f32, divisor: f32) -> f32 {
    (value / divisor).clamp(0.0, 1.0)
}

fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Encode a feature set into the fixed 35-element vector.
///
/// Slot layout (divisor in parentheses):
///  0 url length (200)          1 entropy (6)            2 digit ratio
///  3 letter ratio              4 symbol ratio           5 ngram count (50)
///  6 keyword count (10)        7 ip-host flag           8 explicit-port flag
///  9 https flag               10 subdomains (5)        11 path depth (10)
/// 12 query params (20)        13 fragment length (100) 14 tld risk
/// 15 hostname length (100)    16 path length (100)
/// 17 form count (10)          18 external form flag    19 password inputs (5)
/// 20 scripts (50)             21 external scripts (30) 22 obfuscation flag
/// 23 iframes (10)             24 hidden iframes (5)    25 external domains (20)
/// 26 login-form flag
/// 27 redirect flag            28 tls-valid flag        29 mixed-content flag
/// 30 response time (5000 ms)  31 status code (600)     32 cross-origin-final flag
/// 33 intel-hit flag           34 intel severity
pub fn to_feature_vector(features: &UrlFeatures) -> [f32; FEATURE_VECTOR_LEN] {
    let mut v = [0.0f32; FEATURE_VECTOR_LEN];
    let lex = &features.lexical;

    v[0] = norm(lex.length as f32, 200.0);
    v[1] = norm(lex.entropy, 6.0);
    v[2] = lex.digit_ratio.clamp(0.0, 1.0);
    v[3] = lex.letter_ratio.clamp(0.0, 1.0);
    v[4] = lex.symbol_ratio.clamp(0.0, 1.0);
    v[5] = norm(lex.ngrams.len() as f32, 50.0);
    v[6] = norm(lex.suspicious_keyword_count as f32, 10.0);
    v[7] = flag(lex.is_ip_address);
    v[8] = flag(lex.has_port);
    v[9] = flag(lex.is_https);
    v[10] = norm(lex.subdomain_count as f32, 5.0);
    v[11] = norm(lex.path_depth as f32, 10.0);
    v[12] = norm(lex.query_param_count as f32, 20.0);
    v[13] = norm(lex.fragment_length as f32, 100.0);
    v[14] = lex.tld_risk.clamp(0.0, 1.0);
    v[15] = norm(lex.hostname_length as f32, 100.0);
    v[16] = norm(lex.path_length as f32, 100.0);

    if let Some(dom) = &features.dom {
        v[17] = norm(dom.form_count as f32, 10.0);
        v[18] = flag(dom.has_external_form_action);
        v[19] = norm(dom.password_input_count as f32, 5.0);
        v[20] = norm(dom.script_count as f32, 50.0);
        v[21] = norm(dom.external_script_count as f32, 30.0);
        v[22] = flag(dom.has_obfuscated_scripts);
        v[23] = norm(dom.iframe_count as f32, 10.0);
        v[24] = norm(dom.hidden_iframe_count as f32, 5.0);
        v[25] = norm(dom.external_domains.len() as f32, 20.0);
        v[26] = flag(dom.has_login_form);
        // social login, meta refresh, and popup counts stay struct-only;
        // the trained models were fit on these ten DOM slots.
    }

    if let Some(net) = &features.network {
        v[27] = flag(net.redirected);
        v[28] = flag(net.tls_valid);
        v[29] = flag(net.mixed_content);
        v[30] = norm(net.response_time_ms as f32, 5000.0);
        v[31] = norm(net.status_code as f32, 600.0);
        v[32] = flag(crossed_origin(&features.url, &net.final_url));
    }

    if let Some(hit) = &features.threat_intel {
        v[33] = 1.0;
        v[34] = hit.severity.clamp(0.0, 1.0);
    }

    v
}

/// Whether the final probed URL landed on a different host.
fn crossed_origin(original: &str, final_url: &str) -> bool {
    let host = |u: &str| Url::parse(u).ok().and_then(|u| u.host_str().map(str::to_string));
    match (host(original), host(final_url)) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::extract_lexical;
    use urlguard_core::{DomFeatures, ExtractionTier, NetworkFeatures, ThreatIntelHit};

    fn lexical_only(url: &str) -> UrlFeatures {
        UrlFeatures {
            url: url.to_string(),
            lexical: extract_lexical(url),
            dom: None,
            network: None,
            threat_intel: None,
            tier: ExtractionTier::Lexical,
            extraction_ms: 0,
        }
    }

    #[test]
    fn test_vector_length() {
        let v = to_feature_vector(&lexical_only("https://example.com/a"));
        assert_eq!(v.len(), 35);
    }

    #[test]
    fn test_absent_tiers_zero_filled() {
        let v = to_feature_vector(&lexical_only("https://example.com/a?b=c"));
        for i in 17..=26 {
            assert_eq!(v[i], 0.0, "dom slot {} not zero", i);
        }
        for i in 27..=32 {
            assert_eq!(v[i], 0.0, "network slot {} not zero", i);
        }
        assert_eq!(v[33], 0.0);
        assert_eq!(v[34], 0.0);
    }

    #[test]
    fn test_all_slots_in_unit_interval() {
        let url = format!("https://evil.example.tk:8080/{}?q=1#{}", "x/".repeat(40), "f".repeat(300));
        let mut features = lexical_only(&url);
        features.dom = Some(DomFeatures {
            form_count: 99,
            password_input_count: 99,
            script_count: 999,
            ..Default::default()
        });
        features.network = Some(NetworkFeatures {
            redirected: true,
            final_url: "https://other.example.com/".to_string(),
            tls_valid: true,
            mixed_content: true,
            response_time_ms: 60_000,
            status_code: 200,
        });
        let v = to_feature_vector(&features);
        for (i, x) in v.iter().enumerate() {
            assert!((0.0..=1.0).contains(x), "slot {} out of range: {}", i, x);
        }
    }

    #[test]
    fn test_dom_tier_populates_dom_slots() {
        let mut features = lexical_only("https://example.com/login");
        features.dom = Some(DomFeatures {
            form_count: 2,
            has_login_form: true,
            password_input_count: 1,
            ..Default::default()
        });
        let v = to_feature_vector(&features);
        assert_eq!(v[17], 0.2);
        assert_eq!(v[19], 0.2);
        assert_eq!(v[26], 1.0);
    }

    #[test]
    fn test_cross_origin_final_url() {
        let mut features = lexical_only("https://example.com/");
        features.network = Some(NetworkFeatures {
            redirected: true,
            final_url: "https://elsewhere.net/landing".to_string(),
            tls_valid: true,
            mixed_content: false,
            response_time_ms: 120,
            status_code: 200,
        });
        let v = to_feature_vector(&features);
        assert_eq!(v[27], 1.0);
        assert_eq!(v[32], 1.0);
    }

    #[test]
    fn test_intel_slots() {
        let mut features = lexical_only("https://example.com/");
        features.threat_intel = Some(ThreatIntelHit {
            source: "feed".to_string(),
            category: "phishing".to_string(),
            severity: 0.8,
        });
        let v = to_feature_vector(&features);
        assert_eq!(v[33], 1.0);
        assert!((v[34] - 0.8).abs() < 1e-6);
    }
}

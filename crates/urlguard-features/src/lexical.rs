//! Lexical feature extraction (tier 1)
//!
//! Pure string work over the URL. Deterministic, synchronous, no I/O.
//! A URL that fails to parse is a first-class signal: it produces a
//! synthetic maximal-risk feature set instead of an error.

use aho_corasick::AhoCorasick;
use std::sync::OnceLock;
use url::Url;
use urlguard_core::tld;
use urlguard_core::LexicalFeatures;

/// Cap on the deduplicated 3-gram set.
const MAX_NGRAMS: usize = 50;

/// Keywords that phishing URLs lean on. Matched as lowercase substrings.
const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "login", "signin", "verify", "secure", "account", "update", "confirm", "password", "banking",
    "wallet", "suspend", "unlock", "webscr", "invoice", "payment", "refund", "bonus", "claim",
    "airdrop", "prize", "urgent", "recover", "restore", "authenticate",
];

/// Shannon entropy over character frequencies: -sum(p * log2(p)).
///
/// 0 for the empty string and for any single-repeated-character string;
/// strictly positive and increasing with alphabet diversity otherwise.
pub fn shannon_entropy(s: &str) -> f32 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    let mut total = 0usize;
    for ch in s.chars() {
        *counts.entry(ch).or_insert(0usize) += 1;
        total += 1;
    }
    let total = total as f32;
    counts
        .values()
        .map(|&c| {
            let p = c as f32 / total;
            -p * p.log2()
        })
        .sum()
}

fn keyword_matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(SUSPICIOUS_KEYWORDS)
            .unwrap_or_else(|e| panic!("keyword matcher failed to build: {e}"))
    })
}

/// Count distinct suspicious keywords appearing in the URL.
pub fn keyword_count(url_lower: &str) -> usize {
    let mut seen = [false; SUSPICIOUS_KEYWORDS.len()];
    for m in keyword_matcher().find_overlapping_iter(url_lower) {
        seen[m.pattern().as_usize()] = true;
    }
    seen.iter().filter(|&&hit| hit).count()
}

/// Deduplicated character 3-grams of the lowercased URL, capped.
fn ngram_set(url_lower: &str) -> Vec<String> {
    let chars: Vec<char> = url_lower.chars().collect();
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for window in chars.windows(3) {
        let gram: String = window.iter().collect();
        if seen.insert(gram.clone()) {
            out.push(gram);
            if out.len() >= MAX_NGRAMS {
                break;
            }
        }
    }
    out
}

fn subdomain_count(hostname: &str, tld_str: &str) -> usize {
    if hostname.parse::<std::net::IpAddr>().is_ok() {
        return 0;
    }
    let labels = hostname.split('.').filter(|l| !l.is_empty()).count();
    let tld_labels = if tld_str.is_empty() {
        0
    } else {
        tld_str.split('.').count()
    };
    // Everything left of the registrable label is a subdomain.
    labels.saturating_sub(tld_labels).saturating_sub(1)
}

/// Extract lexical features from a URL.
///
/// Never fails: unparseable input yields [`synthetic_risk_features`].
pub fn extract_lexical(raw_url: &str) -> LexicalFeatures {
    let parsed = match Url::parse(raw_url) {
        Ok(u) => u,
        Err(_) => return synthetic_risk_features(raw_url),
    };
    let hostname = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return synthetic_risk_features(raw_url),
    };

    let url_lower = raw_url.to_lowercase();
    let chars: Vec<char> = raw_url.chars().collect();
    let char_count = chars.len().max(1) as f32;
    let digits = chars.iter().filter(|c| c.is_ascii_digit()).count() as f32;
    let letters = chars.iter().filter(|c| c.is_alphabetic()).count() as f32;
    let symbols = chars.iter().filter(|c| !c.is_alphanumeric()).count() as f32;

    let tld_str = tld::extract_tld(&hostname);
    let path = parsed.path();

    LexicalFeatures {
        url: raw_url.to_string(),
        length: chars.len(),
        entropy: shannon_entropy(raw_url),
        digit_ratio: digits / char_count,
        letter_ratio: letters / char_count,
        symbol_ratio: symbols / char_count,
        ngrams: ngram_set(&url_lower),
        suspicious_keyword_count: keyword_count(&url_lower),
        is_ip_address: hostname.parse::<std::net::IpAddr>().is_ok()
            || hostname.trim_matches(['[', ']']).parse::<std::net::IpAddr>().is_ok(),
        has_port: parsed.port().is_some(),
        is_https: parsed.scheme() == "https",
        subdomain_count: subdomain_count(&hostname, &tld_str),
        path_depth: path.split('/').filter(|s| !s.is_empty()).count(),
        query_param_count: parsed.query_pairs().count(),
        fragment_length: parsed.fragment().map_or(0, |f| f.chars().count()),
        hostname_length: hostname.chars().count(),
        path_length: path.chars().count(),
        tld_risk: if tld_str.is_empty() { 0.5 } else { tld::tld_risk(&tld_str) },
        tld: tld_str,
    }
}

/// Maximal-risk feature set for URLs that do not parse.
///
/// tld_risk pinned to 1.0 and symbol_ratio to 0.5; every other numeric
/// field zeroed, so downstream consumers see a loud but well-formed value.
pub fn synthetic_risk_features(raw_url: &str) -> LexicalFeatures {
    LexicalFeatures {
        url: raw_url.to_string(),
        length: raw_url.chars().count(),
        entropy: 0.0,
        digit_ratio: 0.0,
        letter_ratio: 0.0,
        symbol_ratio: 0.5,
        ngrams: Vec::new(),
        suspicious_keyword_count: 0,
        is_ip_address: false,
        has_port: false,
        is_https: false,
        subdomain_count: 0,
        path_depth: 0,
        query_param_count: 0,
        fragment_length: 0,
        hostname_length: 0,
        path_length: 0,
        tld: String::new(),
        tld_risk: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_empty_and_uniform() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
    }

    #[test]
    fn test_entropy_increases_with_diversity() {
        let low = shannon_entropy("aaaa");
        let high = shannon_entropy("ab12!@");
        assert!(high > low);
        assert!(shannon_entropy("abcdefgh") > shannon_entropy("aabbccdd") - 1e-6);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let url = "https://login.example-bank.tk/verify?user=1#frag";
        let a = extract_lexical(url);
        let b = extract_lexical(url);
        assert_eq!(a, b);
    }

    #[test]
    fn test_basic_fields() {
        let f = extract_lexical("https://a.b.example.com:8443/one/two/three?x=1&y=2#frag");
        assert!(f.is_https);
        assert!(f.has_port);
        assert!(!f.is_ip_address);
        assert_eq!(f.subdomain_count, 2);
        assert_eq!(f.path_depth, 3);
        assert_eq!(f.query_param_count, 2);
        assert_eq!(f.fragment_length, 4);
        assert_eq!(f.tld, "com");
    }

    #[test]
    fn test_two_level_tld_subdomains() {
        let f = extract_lexical("https://mail.example.co.uk/");
        assert_eq!(f.tld, "co.uk");
        assert_eq!(f.subdomain_count, 1);
    }

    #[test]
    fn test_ip_hostname() {
        let f = extract_lexical("http://192.168.1.10/admin");
        assert!(f.is_ip_address);
        assert_eq!(f.subdomain_count, 0);
        assert_eq!(f.tld, "");
    }

    #[test]
    fn test_unparseable_url_is_maximal_risk() {
        let f = extract_lexical("not a url at all");
        assert_eq!(f.tld_risk, 1.0);
        assert_eq!(f.symbol_ratio, 0.5);
        assert_eq!(f.entropy, 0.0);
        assert_eq!(f.subdomain_count, 0);
    }

    #[test]
    fn test_keyword_count() {
        let f = extract_lexical("https://secure-login-verify.example.com/account");
        assert!(f.suspicious_keyword_count >= 4);
    }

    #[test]
    fn test_ngrams_deduped_and_capped() {
        let f = extract_lexical("https://aaaaaaaaaaaa.com/");
        let unique: std::collections::HashSet<_> = f.ngrams.iter().collect();
        assert_eq!(unique.len(), f.ngrams.len());

        let long = format!("https://example.com/{}", "abcdefghij".repeat(30));
        let f = extract_lexical(&long);
        assert!(f.ngrams.len() <= 50);
    }
}

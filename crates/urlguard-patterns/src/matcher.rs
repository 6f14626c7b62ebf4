//! Rule-based URL threat scorer
//!
//! Ten ordered heuristic passes over the URL string. Each pass can raise
//! a running maximum risk, append flags, and add a reasoning line; only
//! the hosting-platform pass acts multiplicatively, and only on the final
//! score. Pure and stateless: the same URL always produces the same
//! result, and analysis never fails.

use crate::config::{PatternConfig, ThreatPattern};
use crate::distance::levenshtein;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use urlguard_core::tld;

/// Cap on the final score and on any single category risk.
const SCORE_CAP: f32 = 0.95;

/// A threat pattern that fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: String,
    pub category: String,
    pub matched_tokens: Vec<String>,
    pub risk: f32,
}

/// Outcome of one analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatchResult {
    /// Final risk score in [0, 1]
    pub score: f32,
    /// Confidence in [0, 1], grows with the number of independent signals
    pub confidence: f32,
    pub matches: Vec<PatternMatch>,
    pub flags: Vec<String>,
    pub reasoning: Vec<String>,
}

impl PatternMatchResult {
    /// Mid-confidence default for URLs that cannot be parsed. Invalid
    /// input is a signal, not an error.
    fn unparseable() -> Self {
        Self {
            score: 0.5,
            confidence: 0.5,
            matches: Vec::new(),
            flags: vec!["parse_error".to_string()],
            reasoning: vec!["URL could not be parsed".to_string()],
        }
    }
}

/// Stateless heuristic scorer over a fixed configuration.
pub struct PatternMatcher {
    config: PatternConfig,
    ipv4: Regex,
    cyrillic: Regex,
    homoglyphs: Vec<(String, Regex)>,
}

impl PatternMatcher {
    pub fn new(config: PatternConfig) -> urlguard_core::Result<Self> {
        let compile = |p: &str| {
            Regex::new(p)
                .map_err(|e| urlguard_core::Error::pattern(format!("bad regex {:?}: {}", p, e)))
        };
        let homoglyphs = [
            ("google", r"g0ogle|go0gle|g00gle|goog1e"),
            ("paypal", r"paypa1|p4ypal|payp4l"),
            ("apple", r"app1e|appl3"),
            ("microsoft", r"micr0soft|micros0ft|rnicrosoft"),
            ("amazon", r"amaz0n|4mazon"),
            ("facebook", r"faceb00k|faceb0ok|facebo0k"),
            ("netflix", r"netf1ix|n3tflix"),
            ("linkedin", r"1inkedin|linked1n"),
            ("twitter", r"tw1tter|twitt3r"),
            ("coinbase", r"c0inbase|coinbas3"),
            ("binance", r"b1nance|binanc3"),
            ("outlook", r"0utlook|outl00k"),
        ]
        .iter()
        .map(|(brand, pattern)| compile(pattern).map(|re| (brand.to_string(), re)))
        .collect::<urlguard_core::Result<Vec<_>>>()?;

        Ok(Self {
            config,
            ipv4: compile(r"^\d{1,3}(\.\d{1,3}){3}$")?,
            cyrillic: compile(r"[\x{0400}-\x{04FF}]")?,
            homoglyphs,
        })
    }

    /// Analyze a raw URL. Never fails; unparseable input yields a
    /// mid-confidence default result.
    pub fn analyze(&self, url: &str) -> PatternMatchResult {
        let url_lower = url.trim().to_lowercase();
        let hostname = match Url::parse(url_lower.trim()) {
            Ok(parsed) => match parsed.host_str() {
                Some(h) => h.to_string(),
                None => return PatternMatchResult::unparseable(),
            },
            Err(_) => return PatternMatchResult::unparseable(),
        };
        let bare_host = hostname.strip_prefix("www.").unwrap_or(&hostname);

        let mut max_risk: f32 = 0.0;
        let mut hosting_multiplier: f32 = 1.0;
        let mut matches = Vec::new();
        let mut flags = Vec::new();
        let mut reasoning = Vec::new();

        // 1. Threat-category token patterns
        for pattern in &self.config.patterns {
            if let Some(m) = match_pattern(pattern, &url_lower) {
                reasoning.push(format!(
                    "matched {} pattern '{}' on tokens [{}]",
                    m.category,
                    m.pattern,
                    m.matched_tokens.join(", ")
                ));
                max_risk = max_risk.max(m.risk);
                matches.push(m);
            }
        }

        // 2. Suspicious TLD
        let tld_str = tld::extract_tld(&hostname);
        if !tld_str.is_empty() {
            let risk = tld::tld_risk(&tld_str);
            if risk > 0.5 {
                flags.push("suspicious_tld".to_string());
                reasoning.push(format!("high-risk TLD .{} (risk {:.2})", tld_str, risk));
            }
            max_risk = max_risk.max(risk * 0.5);
        }

        // 3. Free-hosting platform; recorded now, applied to the final
        // score only.
        for hosting in &self.config.hosting_suffixes {
            if hostname == hosting.suffix || hostname.ends_with(&format!(".{}", hosting.suffix)) {
                hosting_multiplier = hosting.multiplier;
                flags.push("hosting_platform".to_string());
                reasoning.push(format!(
                    "hosted on free platform {} (x{:.2})",
                    hosting.suffix, hosting.multiplier
                ));
                break;
            }
        }

        // 4. URL shortener
        if self.config.shorteners.iter().any(|s| hostname.contains(s.as_str())) {
            max_risk = max_risk.max(0.5);
            flags.push("url_shortener".to_string());
            reasoning.push("URL shortener hides the destination".to_string());
        }

        // 5. IP-literal hostname
        if self.is_ip_literal(&hostname) {
            max_risk = max_risk.max(0.7);
            flags.push("ip_literal_host".to_string());
            reasoning.push("hostname is a raw IP address".to_string());
        }

        // 6. Brand impersonation
        for (brand, real_domains) in &self.config.brand_domains {
            if url_lower.contains(brand.as_str()) && !host_belongs_to(bare_host, real_domains) {
                max_risk = max_risk.max(0.75);
                if !flags.iter().any(|f| f == "brand_impersonation") {
                    flags.push("brand_impersonation".to_string());
                }
                reasoning.push(format!("mentions '{}' but is not a {} domain", brand, brand));
            }
        }

        // 7. Typosquatting
        for popular in &self.config.popular_domains {
            let distance = levenshtein(bare_host, popular);
            if distance > 0 && distance <= 2 {
                let risk = 0.85 - 0.1 * distance as f32;
                max_risk = max_risk.max(risk);
                flags.push("typosquatting".to_string());
                reasoning.push(format!(
                    "host is edit distance {} from {}",
                    distance, popular
                ));
                break;
            }
        }

        // 8. Homoglyphs: digit-for-letter brand spoofs, Cyrillic script,
        // punycode labels.
        for (brand, re) in &self.homoglyphs {
            if re.is_match(&url_lower) {
                max_risk = max_risk.max(0.85);
                flags.push("homoglyph".to_string());
                reasoning.push(format!("character-substitution spoof of '{}'", brand));
                break;
            }
        }
        if self.cyrillic.is_match(&url_lower) {
            max_risk = max_risk.max(0.90);
            flags.push("cyrillic_chars".to_string());
            reasoning.push("Cyrillic characters in a latin-script URL".to_string());
        }
        if hostname.split('.').any(|label| label.starts_with("xn--")) {
            max_risk = max_risk.max(0.70);
            flags.push("punycode".to_string());
            reasoning.push("punycode-encoded hostname label".to_string());
        }

        // 9. Credential-stuffing shape: brand@host
        if !url_lower.starts_with("mailto:") {
            if let Some(at) = url_lower.find('@') {
                let before = &url_lower[..at];
                if self.config.brand_domains.keys().any(|b| before.contains(b.as_str())) {
                    max_risk = max_risk.max(0.95);
                    flags.push("credential_phishing".to_string());
                    reasoning.push("brand name before '@' masks the real host".to_string());
                }
            }
        }

        // 10. Sensitive-keyword density. Damped and only counted from
        // three keywords up, so single-keyword legitimate pages (e.g.
        // login.google.com) do not trip it.
        let keyword_hits = self
            .config
            .keywords
            .iter()
            .filter(|k| url_lower.contains(k.as_str()))
            .count();
        if keyword_hits >= 3 {
            let contribution = (0.10 + 0.05 * keyword_hits as f32).min(0.25);
            max_risk = max_risk.max(contribution);
            flags.push("keyword_density".to_string());
            reasoning.push(format!("{} sensitive keywords in URL", keyword_hits));
        }

        let score = (max_risk * hosting_multiplier).min(SCORE_CAP);
        let confidence = (0.5 + 0.1 * (flags.len() + matches.len()) as f32).min(SCORE_CAP);

        PatternMatchResult {
            score,
            confidence,
            matches,
            flags,
            reasoning,
        }
    }

    fn is_ip_literal(&self, hostname: &str) -> bool {
        self.ipv4.is_match(hostname)
            || (hostname.starts_with('[') && hostname.ends_with(']'))
            || (!hostname.is_empty()
                && hostname.contains('.')
                && hostname.chars().all(|c| c.is_ascii_digit() || c == '.'))
    }
}

fn match_pattern(pattern: &ThreatPattern, url_lower: &str) -> Option<PatternMatch> {
    let matched_tokens: Vec<String> = pattern
        .brands
        .iter()
        .chain(pattern.actions.iter())
        .chain(pattern.techniques.iter())
        .filter(|token| url_lower.contains(token.as_str()))
        .cloned()
        .collect();

    if matched_tokens.len() < pattern.min_matches {
        return None;
    }
    let extra = (matched_tokens.len() - pattern.min_matches) as f32;
    Some(PatternMatch {
        pattern: pattern.name.clone(),
        category: pattern.category.clone(),
        risk: (pattern.base_risk + 0.05 * extra).min(SCORE_CAP),
        matched_tokens,
    })
}

fn host_belongs_to(bare_host: &str, real_domains: &[String]) -> bool {
    real_domains
        .iter()
        .any(|d| bare_host == d || bare_host.ends_with(&format!(".{}", d)))
}

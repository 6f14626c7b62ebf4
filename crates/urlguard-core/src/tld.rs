//! TLD extraction and risk tables
//!
//! Shared by the feature extractor and the pattern matcher so both sides
//! score a given TLD identically.

/// Two-level TLDs recognized before falling back to the last label.
const TWO_LEVEL_TLDS: &[&str] = &[
    "co.uk", "org.uk", "gov.uk", "ac.uk", "me.uk", "co.jp", "ne.jp", "or.jp", "com.au", "net.au",
    "org.au", "co.nz", "com.br", "com.mx", "com.ar", "co.in", "com.cn", "com.tw", "com.sg",
    "co.za", "com.tr", "com.ua", "co.kr", "com.hk",
];

/// TLDs that trusted institutions register under; these override the
/// risk table with a low fixed score.
const TRUSTED_TLDS: &[&str] = &["gov", "edu", "mil", "int"];

const TRUSTED_TLD_RISK: f32 = 0.1;

/// Risk score when the TLD is not in the table.
const DEFAULT_TLD_RISK: f32 = 0.3;

/// Fixed risk table. Free or near-free registries dominate the top of
/// phishing feeds, mainstream commercial TLDs the bottom.
const TLD_RISK_TABLE: &[(&str, f32)] = &[
    ("tk", 0.85),
    ("ml", 0.80),
    ("ga", 0.80),
    ("cf", 0.80),
    ("gq", 0.80),
    ("zip", 0.75),
    ("mov", 0.70),
    ("click", 0.65),
    ("country", 0.65),
    ("stream", 0.65),
    ("download", 0.65),
    ("xyz", 0.60),
    ("top", 0.60),
    ("work", 0.60),
    ("link", 0.55),
    ("info", 0.45),
    ("biz", 0.45),
    ("site", 0.45),
    ("online", 0.45),
    ("icu", 0.55),
    ("buzz", 0.55),
    ("rest", 0.50),
    ("cam", 0.55),
    ("su", 0.50),
    ("ru", 0.40),
    ("cn", 0.40),
    ("io", 0.25),
    ("co", 0.25),
    ("app", 0.20),
    ("dev", 0.20),
    ("me", 0.30),
    ("com", 0.15),
    ("org", 0.15),
    ("net", 0.20),
    ("co.uk", 0.15),
    ("com.au", 0.15),
    ("co.jp", 0.15),
    ("com.br", 0.30),
    ("co.in", 0.30),
];

/// Extract the effective TLD from a hostname.
///
/// Recognizes the fixed two-level set ("example.co.uk" -> "co.uk") before
/// falling back to the last dot-separated label. Returns an empty string
/// for hostnames without a dot or IP literals.
pub fn extract_tld(hostname: &str) -> String {
    let host = hostname.trim_end_matches('.').to_lowercase();
    if host.parse::<std::net::IpAddr>().is_ok() {
        return String::new();
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 3 {
        let last_two = format!("{}.{}", labels[labels.len() - 2], labels[labels.len() - 1]);
        if TWO_LEVEL_TLDS.contains(&last_two.as_str()) {
            return last_two;
        }
    }
    if labels.len() >= 2 {
        labels[labels.len() - 1].to_string()
    } else {
        String::new()
    }
}

/// Risk score in [0, 1] for a TLD, trusted override first.
pub fn tld_risk(tld: &str) -> f32 {
    let tld = tld.to_lowercase();
    if TRUSTED_TLDS.contains(&tld.as_str()) {
        return TRUSTED_TLD_RISK;
    }
    TLD_RISK_TABLE
        .iter()
        .find(|(t, _)| *t == tld)
        .map(|(_, r)| *r)
        .unwrap_or(DEFAULT_TLD_RISK)
}

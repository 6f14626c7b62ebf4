//! Typed, validated pattern-matcher configuration
//!
//! Loaded once at startup (built-in defaults or YAML) and read-only
//! afterwards. Shape problems are caught by `validate` at load time, not
//! by optional-chaining at use time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use urlguard_core::{Error, Result};

/// One threat-category token pattern.
///
/// A pattern fires when the number of its tokens (brands + actions +
/// techniques) found in the lowercased URL reaches `min_matches`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatPattern {
    pub name: String,
    pub category: String,
    pub brands: Vec<String>,
    pub actions: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
    pub base_risk: f32,
    pub min_matches: usize,
}

/// Full pattern-matcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Threat-category token patterns
    #[serde(default)]
    pub patterns: Vec<ThreatPattern>,

    /// Free-hosting suffixes and their score multipliers (> 1.0)
    #[serde(default)]
    pub hosting_suffixes: Vec<HostingSuffix>,

    /// Known URL-shortener domains
    #[serde(default)]
    pub shorteners: Vec<String>,

    /// Popular domains used for typosquat distance checks
    #[serde(default)]
    pub popular_domains: Vec<String>,

    /// Brand token -> legitimate domains for that brand
    #[serde(default)]
    pub brand_domains: HashMap<String, Vec<String>>,

    /// Sensitive keywords for the density step
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostingSuffix {
    pub suffix: String,
    pub multiplier: f32,
}

impl PatternConfig {
    /// Load from a YAML string and validate.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid pattern config: {}", e)))?;
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
        for p in &self.patterns {
            if p.brands.is_empty() || p.actions.is_empty() {
                return Err(Error::config(format!(
                    "pattern '{}' needs at least one brand and one action token",
                    p.name
                )));
            }
            if !(0.0..=1.0).contains(&p.base_risk) {
                return Err(Error::config(format!(
                    "pattern '{}' base_risk {} outside [0, 1]",
                    p.name, p.base_risk
                )));
            }
            if p.min_matches == 0 {
                return Err(Error::config(format!(
                    "pattern '{}' min_matches must be at least 1",
                    p.name
                )));
            }
        }
        for h in &self.hosting_suffixes {
            if h.multiplier <= 1.0 {
                return Err(Error::config(format!(
                    "hosting suffix '{}' multiplier {} must exceed 1.0",
                    h.suffix, h.multiplier
                )));
            }
        }
        Ok(())
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            hosting_suffixes: default_hosting_suffixes(),
            shorteners: strs(&[
                "bit.ly", "tinyurl.com", "goo.gl", "t.co", "ow.ly", "is.gd", "buff.ly",
                "cutt.ly", "rb.gy", "rebrand.ly", "shorturl.at",
            ]),
            popular_domains: strs(&[
                "google.com", "facebook.com", "youtube.com", "amazon.com", "apple.com",
                "microsoft.com", "netflix.com", "paypal.com", "instagram.com", "twitter.com",
                "linkedin.com", "github.com", "yahoo.com", "ebay.com", "chase.com",
                "coinbase.com", "binance.com", "outlook.com", "dropbox.com", "adobe.com",
                "spotify.com", "metamask.io",
            ]),
            brand_domains: default_brand_domains(),
            keywords: strs(&[
                "login", "signin", "verify", "secure", "account", "update", "confirm",
                "password", "banking", "webscr", "suspend", "unlock", "invoice", "payment",
                "refund", "security", "billing", "credential",
            ]),
        }
    }
}

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_patterns() -> Vec<ThreatPattern> {
    vec![
        ThreatPattern {
            name: "crypto_wallet_phishing".to_string(),
            category: "crypto".to_string(),
            brands: strs(&[
                "metamask", "coinbase", "binance", "trustwallet", "phantom", "ledger", "kraken",
            ]),
            actions: strs(&[
                "claim", "airdrop", "connect", "verify", "restore", "unlock", "wallet", "seed",
                "bonus",
            ]),
            techniques: strs(&["urgent", "limited", "free"]),
            base_risk: 0.8,
            min_matches: 2,
        },
        ThreatPattern {
            name: "banking_credential_phishing".to_string(),
            category: "banking".to_string(),
            brands: strs(&[
                "paypal", "chase", "wellsfargo", "bankofamerica", "citibank", "hsbc", "barclays",
            ]),
            actions: strs(&[
                "login", "verify", "secure", "update", "confirm", "account", "suspend",
            ]),
            techniques: strs(&["alert", "notice"]),
            base_risk: 0.75,
            min_matches: 2,
        },
        ThreatPattern {
            name: "webmail_credential_phishing".to_string(),
            category: "webmail".to_string(),
            brands: strs(&["google", "gmail", "outlook", "office365", "microsoft", "yahoo"]),
            actions: strs(&["login", "signin", "password", "verify", "recover", "session"]),
            techniques: strs(&["expired", "storage"]),
            base_risk: 0.75,
            min_matches: 2,
        },
        ThreatPattern {
            name: "social_account_phishing".to_string(),
            category: "social".to_string(),
            brands: strs(&[
                "facebook", "instagram", "twitter", "linkedin", "tiktok", "whatsapp", "telegram",
            ]),
            actions: strs(&["login", "verify", "appeal", "restore", "confirm"]),
            techniques: strs(&["copyright", "violation"]),
            base_risk: 0.7,
            min_matches: 2,
        },
        ThreatPattern {
            name: "delivery_fee_scam".to_string(),
            category: "shipping".to_string(),
            brands: strs(&["dhl", "fedex", "usps", "ups", "royalmail"]),
            actions: strs(&["track", "delivery", "package", "redelivery", "customs", "fee"]),
            techniques: strs(&["pending", "missed"]),
            base_risk: 0.7,
            min_matches: 2,
        },
    ]
}

fn default_hosting_suffixes() -> Vec<HostingSuffix> {
    [
        ("github.io", 1.1),
        ("web.app", 1.3),
        ("firebaseapp.com", 1.3),
        ("netlify.app", 1.2),
        ("vercel.app", 1.2),
        ("pages.dev", 1.2),
        ("blogspot.com", 1.3),
        ("weebly.com", 1.4),
        ("wixsite.com", 1.4),
        ("000webhostapp.com", 1.5),
        ("repl.co", 1.3),
        ("glitch.me", 1.3),
    ]
    .iter()
    .map(|(s, m)| HostingSuffix {
        suffix: s.to_string(),
        multiplier: *m,
    })
    .collect()
}

fn default_brand_domains() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    let mut add = |brand: &str, domains: &[&str]| {
        map.insert(brand.to_string(), strs(domains));
    };
    add("metamask", &["metamask.io"]);
    add("coinbase", &["coinbase.com"]);
    add("binance", &["binance.com", "binance.us"]);
    add("paypal", &["paypal.com", "paypal.me"]);
    add("google", &["google.com", "withgoogle.com", "goo.gl"]);
    add("gmail", &["google.com", "gmail.com"]);
    add("microsoft", &["microsoft.com", "live.com", "office.com", "outlook.com"]);
    add("apple", &["apple.com", "icloud.com"]);
    add("amazon", &["amazon.com", "amazon.co.uk", "amazon.de"]);
    add("netflix", &["netflix.com"]);
    add("facebook", &["facebook.com", "fb.com"]);
    add("instagram", &["instagram.com"]);
    add("twitter", &["twitter.com", "x.com"]);
    add("linkedin", &["linkedin.com"]);
    add("chase", &["chase.com"]);
    add("wellsfargo", &["wellsfargo.com"]);
    add("dhl", &["dhl.com", "dhl.de"]);
    add("fedex", &["fedex.com"]);
    add("usps", &["usps.com"]);
    add("ups", &["ups.com"]);
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        PatternConfig::default().validate().unwrap();
    }

    #[test]
    fn test_yaml_roundtrip() {
        let yaml = r#"
patterns:
  - name: test
    category: crypto
    brands: [metamask]
    actions: [claim]
    base_risk: 0.8
    min_matches: 1
shorteners: [bit.ly]
"#;
        let config = PatternConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.patterns.len(), 1);
        assert_eq!(config.patterns[0].category, "crypto");
        assert!(config.patterns[0].techniques.is_empty());
    }

    #[test]
    fn test_invalid_base_risk_rejected() {
        let yaml = r#"
patterns:
  - name: bad
    category: crypto
    brands: [metamask]
    actions: [claim]
    base_risk: 1.5
    min_matches: 1
"#;
        assert!(PatternConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_zero_min_matches_rejected() {
        let yaml = r#"
patterns:
  - name: bad
    category: crypto
    brands: [metamask]
    actions: [claim]
    base_risk: 0.5
    min_matches: 0
"#;
        assert!(PatternConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_hosting_multiplier_must_exceed_one() {
        let yaml = r#"
hosting_suffixes:
  - suffix: example.app
    multiplier: 0.9
"#;
        assert!(PatternConfig::from_yaml(yaml).is_err());
    }
}

//! urlguard Patterns
//!
//! Deterministic, data-driven heuristic scoring for URLs: threat-category
//! token patterns, TLD risk, typosquatting, homoglyph and punycode
//! spoofing, URL shorteners, free-hosting multipliers, and keyword
//! density. No model, no I/O, sub-millisecond.
//!
//! This signal path is independent of ML inference; callers combine both
//! into a final verdict.

pub mod config;
pub mod distance;
pub mod matcher;

pub use config::{HostingSuffix, PatternConfig, ThreatPattern};
pub use distance::levenshtein;
pub use matcher::{PatternMatch, PatternMatchResult, PatternMatcher};

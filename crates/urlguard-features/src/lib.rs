//! urlguard Features
//!
//! Three-tier feature extraction for URLs:
//! - Tier 1 (lexical): pure string analysis, always available
//! - Tier 2 (DOM): live-page inspection via a host-supplied handle
//! - Tier 3 (network): one bounded HEAD-style probe
//!
//! Plus the fixed 35-element vector encoder consumed by paired trained
//! models.

pub mod extractor;
pub mod lexical;
pub mod probe;
pub mod vector;

pub use extractor::{FeatureExtractor, PROBE_TIMEOUT_MS};
pub use lexical::{extract_lexical, shannon_entropy, synthetic_risk_features};
pub use probe::HttpProber;
pub use vector::{to_feature_vector, DOM_OFFSET, FEATURE_VECTOR_LEN, INTEL_OFFSET, NETWORK_OFFSET};

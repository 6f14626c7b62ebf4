//! Default reqwest-backed network prober (tier 3)

use async_trait::async_trait;
use std::time::{Duration, Instant};
use url::Url;
use urlguard_core::{Error, NetworkFeatures, NetworkProber, Result};

/// HEAD-style prober over a shared reqwest client.
///
/// Redirects are followed by the client; the features report whether the
/// final URL differs from the request URL. The timeout passed to
/// [`head_probe`](NetworkProber::head_probe) is a hard deadline that
/// aborts the in-flight request.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::capability(format!("failed to build probe client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkProber for HttpProber {
    async fn head_probe(&self, url: &str, timeout_ms: u64) -> Result<NetworkFeatures> {
        let started = Instant::now();

        let send = self.client.head(url).send();
        let response = tokio::time::timeout(Duration::from_millis(timeout_ms), send)
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::capability(format!("head probe failed: {}", e)))?;

        let final_url = response.url().to_string();
        Ok(NetworkFeatures {
            redirected: was_redirected(url, response.url()),
            tls_valid: response.url().scheme() == "https",
            // A HEAD probe cannot see subresources; left false unless the
            // host wires in a page-level signal.
            mixed_content: false,
            response_time_ms: started.elapsed().as_millis() as u64,
            status_code: response.status().as_u16(),
            final_url,
        })
    }
}

/// Whether the response landed somewhere other than the requested URL.
///
/// Compared on parsed form, so client-side normalization of the input
/// (an implied root path, default-port elision) does not read as a
/// redirect.
fn was_redirected(requested: &str, landed: &Url) -> bool {
    match Url::parse(requested) {
        Ok(requested) => requested != *landed,
        Err(_) => requested != landed.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_input_is_not_a_redirect() {
        let landed = Url::parse("https://example.com/").unwrap();
        assert!(!was_redirected("https://example.com", &landed));
        assert!(!was_redirected("https://example.com:443/", &landed));
    }

    #[test]
    fn test_real_redirects_are_reported() {
        let landed = Url::parse("https://example.com/landing").unwrap();
        assert!(was_redirected("https://example.com/start", &landed));

        let landed = Url::parse("https://other.example.net/").unwrap();
        assert!(was_redirected("https://example.com/", &landed));
    }
}

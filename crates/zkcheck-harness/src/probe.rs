//! Direct HTTP probing of static assets
//!
//! The prover needs its circuit artifacts (compiled circuit, proving key,
//! verification key) served from the app's static path. Fetching them
//! directly, outside the page, tells "artifact missing" apart from
//! "workflow broken".

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info, warn};
use zkcheck_core::config::join_url;
use zkcheck_core::{HarnessError, ResourceCheck, ResourceResult, Result};

/// Fetches resources relative to a base URL
#[derive(Debug, Clone)]
pub struct ResourceProbe {
    client: reqwest::Client,
    base_url: String,
}

impl ResourceProbe {
    /// Create a probe whose requests give up after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HarnessError::Probe(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Absolute URL for a check
    pub fn url_for(&self, check: &ResourceCheck) -> String {
        join_url(&self.base_url, &check.url)
    }

    /// GET one resource; never fails, transport errors become `status = 0`
    pub async fn check(&self, check: &ResourceCheck) -> ResourceResult {
        let url = self.url_for(check);
        debug!("Probing {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} unreachable: {}", url, e);
                return ResourceResult::unreachable(check, url, e.to_string());
            }
        };

        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let result = ResourceResult::from_response(
            check,
            url,
            response.status().as_u16(),
            content_length,
            content_type,
        );

        if let Some(expected) = &check.expected_content_type {
            if result.ok && !result.content_type_matches(expected) {
                warn!(
                    "{} served as {:?}, expected {}",
                    result.name, result.content_type, expected
                );
            }
        }

        info!(
            "{}: {} ({} bytes)",
            result.name,
            result.status,
            result
                .content_length
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        result
    }

    /// Probe every check in order; one failure does not stop the rest
    pub async fn check_all(&self, checks: &[ResourceCheck]) -> Vec<ResourceResult> {
        let mut results = Vec::with_capacity(checks.len());
        for check in checks {
            results.push(self.check(check).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(base_url: &str) -> ResourceProbe {
        ResourceProbe::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_for() {
        let probe = probe("http://localhost:3000/");
        assert_eq!(
            probe.url_for(&ResourceCheck::new("/circuits/deposit.wasm")),
            "http://localhost:3000/circuits/deposit.wasm"
        );
        assert_eq!(
            probe.url_for(&ResourceCheck::new("http://cdn.local/vk.json")),
            "http://cdn.local/vk.json"
        );
    }

    #[test]
    fn test_url_for_matches_config_resolution() {
        let config = zkcheck_core::HarnessConfig {
            base_url: "http://localhost:3000/app/".to_string(),
            ..Default::default()
        };
        let probe = probe(&config.base_url);
        for check in &config.resources {
            assert_eq!(probe.url_for(check), config.resolve_url(&check.url));
        }
    }

    #[tokio::test]
    async fn test_not_found_is_not_ok() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/circuits/deposit.wasm")
            .with_status(404)
            .create_async()
            .await;

        let result = probe(&server.url())
            .check(&ResourceCheck::new("/circuits/deposit.wasm"))
            .await;
        assert_eq!(result.status, 404);
        assert!(!result.ok);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_content_length_recorded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/circuits/deposit_final.zkey")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(vec![7u8; 1234])
            .create_async()
            .await;

        let result = probe(&server.url())
            .check(&ResourceCheck::new("/circuits/deposit_final.zkey"))
            .await;
        assert!(result.ok);
        assert_eq!(result.status, 200);
        assert_eq!(result.content_length, Some(1234));
        assert_eq!(result.name, "deposit_final.zkey");
        assert!(result.content_type_matches("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        // Port 9 (discard) is closed on test hosts
        let result = probe("http://127.0.0.1:9")
            .check(&ResourceCheck::new("/circuits/deposit.wasm"))
            .await;
        assert_eq!(result.status, 0);
        assert!(!result.ok);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_check_all_continues_after_failure() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/circuits/deposit.wasm")
            .with_status(404)
            .create_async()
            .await;
        let _vk = server
            .mock("GET", "/circuits/deposit_vk.json")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let results = probe(&server.url())
            .check_all(&[
                ResourceCheck::new("/circuits/deposit.wasm"),
                ResourceCheck::new("/circuits/deposit_vk.json"),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].ok);
        assert!(results[1].ok);
    }
}

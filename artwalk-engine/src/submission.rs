//! Survey submission-limit client
//!
//! The survey backend caps how many completion rewards it hands out. Shortly
//! before a user completes the hunt we ask whether the cap has been reached,
//! so the congratulations flow can adjust its copy. The check is best-effort:
//! any failure is treated as "limit not reached" by the caller.

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct LimitResponse {
    limit_reached: bool,
}

/// HTTP client for the survey backend
pub struct SubmissionClient {
    /// HTTP client with configured timeouts
    client: Client,
    /// Base URL of the survey backend
    base_url: String,
}

impl SubmissionClient {
    /// Create a new client for the given backend base URL
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be built (should not happen with
    /// valid config)
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, base_url }
    }

    /// Ask the backend whether the submission cap has been reached
    pub async fn limit_reached(&self, user_id: Uuid) -> Result<bool> {
        let url = format!("{}/limit", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[("user", user_id.to_string())])
            .send()
            .await
            .map_err(|e| Error::Internal(format!("limit check request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "limit check returned {}",
                response.status()
            )));
        }

        let body: LimitResponse = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("limit check body invalid: {}", e)))?;

        Ok(body.limit_reached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_response_parses() {
        let body: LimitResponse = serde_json::from_str(r#"{"limit_reached": true}"#).unwrap();
        assert!(body.limit_reached);

        let body: LimitResponse =
            serde_json::from_str(r#"{"limit_reached": false, "remaining": 12}"#).unwrap();
        assert!(!body.limit_reached);
    }
}

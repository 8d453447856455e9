use crate::error::ProxyError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    sequences: &'a [String],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    results: Vec<String>,
}

/// Process-wide pooled HTTP client for the downstream classification
/// service. One operation: `classify`. No per-call retries, since the
/// caller batch is already a best-effort aggregation, and retrying
/// risks head-of-line blocking other batches.
pub struct DownstreamClient {
    client: Client,
    url: String,
}

impl DownstreamClient {
    pub fn new(url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(256)
            .tcp_nodelay(true)
            .timeout(timeout)
            .build()
            .expect("reqwest client");

        Self { client, url }
    }

    pub async fn classify(&self, sequences: &[String]) -> Result<Vec<String>, ProxyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { sequences })
            .send()
            .await
            .map_err(|e| ProxyError::Downstream(e.to_string()))?;

        if !resp.status().is_success() {
            let code = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProxyError::Downstream(format!("status {code}: {body}")));
        }

        let parsed: ClassifyResponse = resp
            .json()
            .await
            .map_err(|e| ProxyError::Downstream(e.to_string()))?;

        Ok(parsed.results)
    }
}

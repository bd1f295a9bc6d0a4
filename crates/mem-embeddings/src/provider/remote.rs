//! Remote HTTP embedding provider with retry and cost accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use mem_core::retry::{with_retry, RetryConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Embedded;
use crate::error::EmbeddingError;

const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];
const RETRYABLE_CODES: [&str; 4] = ["ECONNRESET", "ETIMEDOUT", "ENOTFOUND", "ECONNREFUSED"];

/// Per-million-token prices, provider-specific constants.
#[derive(Debug, Clone, Copy)]
pub struct PriceTable {
    pub small_per_million: f64,
    pub large_per_million: f64,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self { small_per_million: 0.02, large_per_million: 0.13 }
    }
}

pub struct RemoteProvider {
    client: Client,
    api_base: String,
    api_key: String,
    model_id: String,
    small_dims: usize,
    large_dims: usize,
    prices: PriceTable,
    retry: RetryConfig,
    tokens_total: AtomicU64,
    cost_total_cents: Mutex<f64>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedResponseItem>,
    usage: Option<EmbedUsage>,
}

#[derive(Deserialize)]
struct EmbedResponseItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedUsage {
    total_tokens: u64,
}

impl RemoteProvider {
    #[must_use]
    pub fn new(api_base: String, api_key: String, model_id: String, small_dims: usize, large_dims: usize) -> Self {
        Self {
            client: Client::new(),
            api_base,
            api_key,
            model_id,
            small_dims,
            large_dims,
            prices: PriceTable::default(),
            retry: RetryConfig::default(),
            tokens_total: AtomicU64::new(0),
            cost_total_cents: Mutex::new(0.0),
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub const fn small_dims(&self) -> usize {
        self.small_dims
    }

    #[must_use]
    pub const fn large_dims(&self) -> usize {
        self.large_dims
    }

    #[must_use]
    pub fn tokens_total(&self) -> u64 {
        self.tokens_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn estimated_cost_usd(&self) -> f64 {
        *self.cost_total_cents.lock().expect("cost mutex poisoned") / 100.0
    }

    pub async fn embed(&self, text: &str, dimensions: usize) -> Result<Embedded, EmbeddingError> {
        let body = EmbedRequest { model: &self.model_id, input: text, dimensions };
        let response = with_retry(
            &self.retry,
            |error: &EmbeddingError| is_retryable(error),
            || async {
                let response = self
                    .client
                    .post(format!("{}/embeddings", self.api_base))
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| classify_transport_error(&e))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(EmbeddingError::EmbedFailed(format!("http {status}")));
                }
                response
                    .json::<EmbedResponse>()
                    .await
                    .map_err(|e| EmbeddingError::EmbedFailed(e.to_string()))
            },
        )
        .await?;

        let vector = response.data.into_iter().next().ok_or(EmbeddingError::EmptyResult)?.embedding;
        let tokens = response.usage.map_or(0, |u| u.total_tokens);
        self.tokens_total.fetch_add(tokens, Ordering::Relaxed);

        let price_per_million =
            if dimensions == self.small_dims { self.prices.small_per_million } else { self.prices.large_per_million };
        let cost = (tokens as f64 / 1_000_000.0) * price_per_million * 100.0;
        *self.cost_total_cents.lock().expect("cost mutex poisoned") += cost;

        Ok(Embedded { vector, tokens, cost_usd: cost / 100.0 })
    }
}

fn classify_transport_error(error: &reqwest::Error) -> EmbeddingError {
    let message = error.to_string();
    EmbeddingError::EmbedFailed(message)
}

fn is_retryable(error: &EmbeddingError) -> bool {
    let EmbeddingError::EmbedFailed(message) = error else { return false };
    if let Some(status) = extract_status(message) {
        if RETRYABLE_STATUS.contains(&status) {
            return true;
        }
    }
    RETRYABLE_CODES.iter().any(|code| message.contains(code))
}

fn extract_status(message: &str) -> Option<u16> {
    message.strip_prefix("http ").and_then(|rest| rest.split_whitespace().next()).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_codes_are_classified() {
        assert!(is_retryable(&EmbeddingError::EmbedFailed("http 429 Too Many Requests".to_string())));
        assert!(is_retryable(&EmbeddingError::EmbedFailed("http 503 Service Unavailable".to_string())));
        assert!(!is_retryable(&EmbeddingError::EmbedFailed("http 400 Bad Request".to_string())));
    }

    #[test]
    fn retryable_transport_codes_are_classified() {
        assert!(is_retryable(&EmbeddingError::EmbedFailed("connect error: ECONNRESET".to_string())));
        assert!(!is_retryable(&EmbeddingError::EmbedFailed("parse error".to_string())));
    }
}

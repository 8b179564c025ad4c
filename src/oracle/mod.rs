//! LLM extraction oracle (§4.4 step 2, ground truth `mq/handler.py`'s
//! `extract_entries_with_gpt`).

pub mod openai_client;
pub mod prompt;

use crate::models::OracleExtractionResponse;
use async_trait::async_trait;
use thiserror::Error;

pub use openai_client::OpenAiOracle;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("oracle returned no response content")]
    EmptyResponse,
    #[error("oracle response was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A remote entity-extraction oracle. One call per email (§4.4 step 2);
/// non-JSON or malformed responses are a fatal per-unit error confined to
/// the single email (§6 "Oracle (LLM) API").
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract(&self, email_body: &str) -> Result<OracleExtractionResponse, OracleError>;
}

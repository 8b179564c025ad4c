//! OpenAI chat-completion client for the extraction oracle.

use super::{ExtractionOracle, OracleError, prompt::SYSTEM_PROMPT};
use crate::config::OracleConfig;
use crate::models::OracleExtractionResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Temperature and response-format match `mq/handler.py`'s oracle call
/// exactly (§4.4: "Temperature 0.2, response-format JSON-only").
const TEMPERATURE: f32 = 0.2;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat<'a>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiOracle {
    http: reqwest::Client,
    config: OracleConfig,
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ExtractionOracle for OpenAiOracle {
    async fn extract(&self, email_body: &str) -> Result<OracleExtractionResponse, OracleError> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: email_body,
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(OracleError::EmptyResponse)?;

        Ok(serde_json::from_str(&content)?)
    }
}

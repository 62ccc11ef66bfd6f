//! Remote text-generation clients.
//!
//! A [`TextGenerator`] takes one prompt and returns the model's raw reply.
//! OpenAI-compatible endpoints are called directly over reqwest; Gemini goes
//! through rstructor.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use rstructor::{GeminiClient, GeminiModel, LLMClient};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!("subline/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("LLM API returned {status}: {body}")]
    BadStatus { status: u16, body: String },
    #[error("LLM returned an empty reply")]
    EmptyReply,
    #[error("configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        AgentError::RequestFailed(e.to_string())
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and return the reply text
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;

    /// Provider and model, for logs and status lines
    fn describe(&self) -> String;
}

/// Build the generator for the configured provider
pub fn build_generator(config: &Config) -> Result<Box<dyn TextGenerator>, AgentError> {
    let api_key = config.api_key()?;
    let timeout = Duration::from_secs(config.agent.timeout_secs);

    let generator: Box<dyn TextGenerator> = match config.agent.provider.as_str() {
        "gemini" => Box::new(GeminiGenerator::new(api_key, &config.agent.model)?),
        _ => Box::new(OpenAiGenerator::new(
            &config.agent.base_url,
            api_key,
            &config.agent.model,
            timeout,
        )?),
    };
    info!(generator = %generator.describe(), "LLM client ready");
    Ok(generator)
}

/// Chat-completions client for OpenAI and compatible APIs.
pub struct OpenAiGenerator {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiGenerator {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        if model.trim().is_empty() {
            return Err(AgentError::RequestFailed("agent.model is empty".to_string()));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "calling chat completions");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::RequestFailed(format!("invalid response format: {e}")))?;
        first_choice(parsed)
    }

    fn describe(&self) -> String {
        format!("openai/{}", self.model)
    }
}

fn first_choice(response: ChatResponse) -> Result<String, AgentError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(AgentError::EmptyReply)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

/// Gemini client through rstructor.
pub struct GeminiGenerator {
    client: GeminiClient,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AgentError> {
        let client = GeminiClient::new(api_key)
            .map_err(|e| AgentError::RequestFailed(e.to_string()))?
            .model(parse_gemini_model(model));

        Ok(Self {
            client,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let result = self
            .client
            .generate_with_metadata(prompt)
            .await
            .map_err(|e| AgentError::RequestFailed(e.to_string()))?;

        if result.text.trim().is_empty() {
            return Err(AgentError::EmptyReply);
        }
        Ok(result.text)
    }

    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }
}

/// Parse a model string into a GeminiModel
fn parse_gemini_model(model: &str) -> GeminiModel {
    match model {
        "gemini-2.0-flash" => GeminiModel::Gemini20Flash,
        "gemini-2.5-flash" => GeminiModel::Gemini25Flash,
        "gemini-2.5-pro" => GeminiModel::Gemini25Pro,
        _ => GeminiModel::Gemini20Flash, // Default
    }
}

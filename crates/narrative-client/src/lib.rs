pub mod error;
pub mod prompt;

pub use error::{NarrativeError, NarrativeResult};
pub use prompt::{build_prompt, MAX_PROMPT_CHARS, SYSTEM_INSTRUCTION};

use std::time::Duration;

use insurance_core::DerivedMetrics;
use serde::{Deserialize, Serialize};

/// Configuration for the text-generation service.
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("NARRATIVE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8010".to_string()),
            api_key: std::env::var("NARRATIVE_API_KEY").ok(),
            model: std::env::var("NARRATIVE_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Client for the narrative text-generation service. Speaks the
/// OpenAI-compatible chat-completions protocol.
#[derive(Clone)]
pub struct NarrativeClient {
    client: reqwest::Client,
    config: NarrativeConfig,
}

impl NarrativeClient {
    pub fn new(config: NarrativeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn with_defaults() -> Self {
        Self::new(NarrativeConfig::default())
    }

    /// Generate a prose narrative for one company's metrics, optionally
    /// comparing against peer figures.
    pub async fn narrate(
        &self,
        subject: &DerivedMetrics,
        peers: &[DerivedMetrics],
    ) -> NarrativeResult<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(subject, peers),
                },
            ],
            max_tokens: 700,
            temperature: 0.4,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(NarrativeError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let result = response.json::<ChatResponse>().await?;
        let text = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| NarrativeError::InvalidResponse("empty choices array".to_string()))?;

        tracing::debug!("narrative generated: {} chars", text.len());
        Ok(text)
    }

    /// Convenience over `narrate` for callers holding a possibly-empty
    /// metrics history: the latest period is the subject.
    pub async fn narrate_history(
        &self,
        symbol: &str,
        history: &[DerivedMetrics],
    ) -> NarrativeResult<String> {
        let subject = history
            .first()
            .ok_or_else(|| NarrativeError::NoData(symbol.to_string()))?;
        self.narrate(subject, &history[1..]).await
    }
}

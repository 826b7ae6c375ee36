//! Gemini `generateContent` client over plain REST.

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_TEMPERATURE, REQUEST_TIMEOUT, RESPONSE_MIME_TYPE, USER_AGENT,
};
use crate::services::generation::{GenerationClient, GenerationError, GenerationReply};

pub type GenericRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Finish reasons that indicate the candidate was withheld rather than
/// completed; an empty reply carrying one of these is a terminal block.
const BLOCKING_FINISH_REASONS: &[&str] =
    &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "OTHER"];

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
    temperature: f32,
    limiter: Option<Arc<GenericRateLimiter>>,
}

impl GeminiClient {
    /// Build a client from the conventional environment variables, failing
    /// fast when no key is configured.
    pub fn from_env(
        model: impl Into<String>,
        requests_per_second: u32,
    ) -> Result<Self, GenerationError> {
        let api_key = std::env::var("GOOGLE_AI_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| GenerationError::MissingApiKey)?;
        let limiter = NonZeroU32::new(requests_per_second)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));
        Self::new(api_key, model, limiter)
    }

    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        limiter: Option<Arc<GenericRateLimiter>>,
    ) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        let model = model.into();
        if model.trim().is_empty() {
            return Err(GenerationError::message("generation model must not be empty"));
        }
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        let base_url = Url::parse(DEFAULT_GEMINI_BASE_URL)
            .map_err(|err| GenerationError::message(format!("invalid base url: {err}")))?;

        Ok(Self {
            http,
            base_url,
            api_key,
            model,
            temperature: DEFAULT_TEMPERATURE,
            limiter,
        })
    }

    /// Point the client at a different endpoint root (test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, GenerationError> {
        self.base_url = Url::parse(base_url)
            .map_err(|err| GenerationError::message(format!("invalid base url: {err}")))?;
        Ok(self)
    }

    /// Override the request timeout (the default is 300 s).
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, GenerationError> {
        self.http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(self)
    }

    fn endpoint(&self) -> Result<Url, GenerationError> {
        let path = format!("v1beta/models/{}:generateContent", self.model);
        let mut url = self
            .base_url
            .join(&path)
            .map_err(|err| GenerationError::message(format!("invalid endpoint: {err}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationReply, GenerationError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: RESPONSE_MIME_TYPE,
            },
        };

        let response = self.http.post(self.endpoint()?).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let payload: GenerateContentResponse = response.json().await?;

        if let Some(reason) = payload
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            tracing::warn!(block_reason = reason, "prompt blocked by the service");
            return Ok(GenerationReply::Blocked {
                reason: format!("prompt blocked: {reason}"),
            });
        }

        let candidate = match payload.candidates.first() {
            Some(candidate) => candidate,
            None => {
                return Ok(GenerationReply::Text(String::new()));
            }
        };

        let text: String = candidate
            .content
            .as_ref()
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            if let Some(reason) = candidate.finish_reason.as_deref() {
                if BLOCKING_FINISH_REASONS.contains(&reason) {
                    tracing::warn!(finish_reason = reason, "candidate withheld by the service");
                    return Ok(GenerationReply::Blocked {
                        reason: format!("candidate withheld: {reason}"),
                    });
                }
            }
        }

        Ok(GenerationReply::Text(text))
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_model_is_rejected() {
        let result = GeminiClient::new("key", "  ", None);
        assert!(result.is_err());
    }

    #[test]
    fn endpoint_includes_model_and_key() {
        let client = GeminiClient::new("secret", "gemini-1.5-flash-latest", None)
            .expect("client builds");
        let url = client.endpoint().expect("endpoint builds");
        assert!(url
            .path()
            .ends_with("models/gemini-1.5-flash-latest:generateContent"));
        assert!(url.query().unwrap_or_default().contains("key=secret"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "ñandú".repeat(200);
        let short = truncate(&text, 500);
        assert!(short.len() <= 504);
    }
}

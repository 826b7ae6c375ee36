//! Generation-service boundary.
//!
//! The backend is a black box behind `GenerationClient`: anything that takes
//! the batch prompt and answers with text (or a structured refusal) can be
//! plugged in, which is also what makes the retry logic testable without a
//! network.

use async_trait::async_trait;
use thiserror::Error;

/// Outcome of one generation call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationReply {
    /// Raw text payload; expected (but not trusted) to contain a JSON array.
    Text(String),
    /// The service withheld the response for policy/safety reasons. Terminal
    /// for the batch: retrying the same content cannot succeed.
    Blocked { reason: String },
}

/// Transport and decoding failures. All variants are transient from the
/// extraction client's point of view, except `MissingApiKey`, which is a
/// configuration error surfaced before any batch work begins.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("missing GOOGLE_AI_API_KEY or GEMINI_API_KEY environment variable")]
    MissingApiKey,
    #[error("{0}")]
    Message(String),
}

impl GenerationError {
    pub fn message(msg: impl Into<String>) -> Self {
        GenerationError::Message(msg.into())
    }
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GenerationReply, GenerationError>;
}

//! IO-bound coordination layer.
//!
//! Modules here talk to external systems (the generation service) or drive
//! long-running work; pure transforms live in `crate::pipeline` so retry and
//! resource accounting stay localized.

pub mod extraction;
pub mod gemini;
pub mod generation;
pub mod orchestrator;

pub use extraction::{ExtractionClient, RetryPolicy};
pub use gemini::{GeminiClient, GenericRateLimiter};
pub use generation::{GenerationClient, GenerationError, GenerationReply};
pub use orchestrator::{BatchOrchestrator, RunReport};

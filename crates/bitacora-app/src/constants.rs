//! Cross-cutting application constants.

use std::time::Duration;

/// Hard timeout for one generation-service call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Low fixed temperature to favor deterministic structural compliance.
pub const DEFAULT_TEMPERATURE: f32 = 0.05;

/// The prompt demands JSON; ask the service for it explicitly too.
pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// Public Gemini REST endpoint root.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const USER_AGENT: &str = "bitacora/0.1";

/// Pause between consecutive batches, applied only for larger batch sizes to
/// stay under informal rate limits.
pub const INTER_BATCH_PAUSE: Duration = Duration::from_millis(200);
pub const INTER_BATCH_PAUSE_THRESHOLD: usize = 10;

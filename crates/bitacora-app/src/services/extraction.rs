//! Batch extraction client: one generation call wrapped in cleaning,
//! parsing, validation, normalization, and retry with backoff.
//!
//! `extract` has no error return. Whatever the service does — transient
//! failures, policy blocks, wrong-length arrays — the caller always gets a
//! result of exactly the input length; total failure degrades to empty
//! placeholders instead of raising, so the orchestrator never needs
//! per-batch exception handling.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::pipeline::event::{
    BatchDisposition, BatchExtraction, ExtractedEvent, RowEvents, WireEvent, WireRow,
};
use crate::pipeline::normalize::{normalize_action, normalize_component};
use crate::pipeline::prompt::build_prompt;
use crate::services::generation::{GenerationClient, GenerationReply};
use crate::vocabulary::Component;

/// Injectable retry schedule. The delay curve is a pure function so tests
/// can assert on it without sleeping, and run with a zero base delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Exponential backoff before retry `attempt` (1-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        self.base_delay.saturating_mul(2_u32.saturating_pow(exponent))
    }
}

pub struct ExtractionClient {
    client: Arc<dyn GenerationClient>,
    retry: RetryPolicy,
}

impl ExtractionClient {
    pub fn new(client: Arc<dyn GenerationClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Extract events for a batch of descriptions.
    ///
    /// The returned `rows` has exactly `descriptions.len()` entries, in input
    /// order, whatever happened upstream.
    pub async fn extract(&self, descriptions: &[String]) -> BatchExtraction {
        let expected = descriptions.len();
        if expected == 0 {
            return BatchExtraction {
                rows: Vec::new(),
                disposition: BatchDisposition::Clean { attempts: 0 },
            };
        }

        let prompt = build_prompt(descriptions);
        let attempts = self.retry.attempts();
        let mut last_error = String::from("no attempt executed");
        let mut blocked: Option<String> = None;
        let mut forced: Option<Vec<JsonValue>> = None;
        let mut attempt = 0;

        while attempt < attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                tracing::info!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "waiting before retry"
                );
                tokio::time::sleep(delay).await;
            }

            let reply = match self.client.generate(&prompt).await {
                Ok(reply) => reply,
                Err(err) => {
                    last_error = err.to_string();
                    tracing::warn!(attempt = attempt + 1, error = %last_error, "generation call failed");
                    attempt += 1;
                    continue;
                }
            };

            let text = match reply {
                GenerationReply::Blocked { reason } => {
                    // Terminal: the same content will be refused again.
                    tracing::warn!(reason = %reason, "batch blocked; not retrying");
                    blocked = Some(reason);
                    break;
                }
                GenerationReply::Text(text) => text,
            };

            if text.trim().is_empty() {
                last_error = "empty response text".to_string();
                tracing::warn!(attempt = attempt + 1, "empty response; retrying");
                attempt += 1;
                continue;
            }

            let cleaned = strip_code_fences(text.trim());
            let payload = isolate_json_array(cleaned);

            let value: JsonValue = match serde_json::from_str(payload) {
                Ok(value) => value,
                Err(err) => {
                    last_error = format!("response is not valid JSON: {err}");
                    tracing::warn!(attempt = attempt + 1, error = %last_error, "parse failed");
                    attempt += 1;
                    continue;
                }
            };

            let items = match value {
                JsonValue::Array(items) => items,
                other => {
                    last_error = format!("response JSON is not an array (got {})", json_kind(&other));
                    tracing::warn!(attempt = attempt + 1, error = %last_error, "shape invalid");
                    attempt += 1;
                    continue;
                }
            };

            if items.len() != expected {
                last_error = format!(
                    "response length mismatch: expected {expected}, got {}",
                    items.len()
                );
                if attempt + 1 < attempts {
                    tracing::warn!(attempt = attempt + 1, error = %last_error, "length mismatch; retrying");
                    attempt += 1;
                    continue;
                }
                // Final attempt: prefer partial data over total loss.
                tracing::warn!(
                    expected,
                    received = items.len(),
                    "length mismatch on final attempt; forcing acceptance"
                );
                forced = Some(items);
                attempt += 1;
                break;
            }

            let rows = normalize_items(items, expected);
            return BatchExtraction {
                rows,
                disposition: BatchDisposition::Clean {
                    attempts: attempt + 1,
                },
            };
        }

        if let Some(reason) = blocked {
            return BatchExtraction {
                rows: vec![RowEvents::default(); expected],
                disposition: BatchDisposition::Blocked { reason },
            };
        }

        if let Some(items) = forced {
            let received = items.len();
            let mut rows = normalize_items(items, expected);
            pad_rows(&mut rows, expected);
            return BatchExtraction {
                rows,
                disposition: BatchDisposition::Forced {
                    received,
                    attempts: attempt,
                    last_error,
                },
            };
        }

        BatchExtraction {
            rows: vec![RowEvents::default(); expected],
            disposition: BatchDisposition::Exhausted {
                attempts: attempt,
                last_error,
            },
        }
    }
}

/// Normalize up to `expected` wire items into per-row event lists.
///
/// A structurally invalid item degrades to an empty row rather than failing
/// the batch; events with unknown components are dropped; unrecognised
/// actions fall back to the neutral default instead of being dropped.
fn normalize_items(items: Vec<JsonValue>, expected: usize) -> Vec<RowEvents> {
    items
        .into_iter()
        .take(expected)
        .enumerate()
        .map(|(index, item)| match serde_json::from_value::<WireRow>(item) {
            Ok(row) => RowEvents {
                events: row
                    .detected_events
                    .iter()
                    .filter_map(|event| normalize_event(index, event))
                    .collect(),
            },
            Err(err) => {
                tracing::warn!(row = index, error = %err, "invalid result shape; using empty row");
                RowEvents::default()
            }
        })
        .collect()
}

fn normalize_event(row_index: usize, event: &WireEvent) -> Option<ExtractedEvent> {
    let (raw_component, raw_action) = match (&event.component, &event.action) {
        (Some(component), Some(action)) => (component, action),
        _ => {
            tracing::warn!(row = row_index, "event missing component or action; skipping");
            return None;
        }
    };

    let component = normalize_component(raw_component);
    if component == Component::Unknown {
        tracing::debug!(row = row_index, component = %raw_component, "unknown component; dropping event");
        return None;
    }

    Some(ExtractedEvent {
        component,
        action: normalize_action(raw_action),
        accessory_id: event.accessory_id_string(),
    })
}

fn pad_rows(rows: &mut Vec<RowEvents>, expected: usize) {
    while rows.len() < expected {
        rows.push(RowEvents::default());
    }
}

/// Strip surrounding Markdown code-fence markup, if any.
fn strip_code_fences(text: &str) -> &str {
    static FENCE_RE: OnceLock<Regex> = OnceLock::new();
    let regex = FENCE_RE.get_or_init(|| {
        Regex::new(r"(?is)```(?:json)?\s*([\s\S]*?)\s*```").expect("fence regex compiles")
    });
    match regex.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    }
}

/// Locate the outermost `[...]` span and use it as the candidate payload when
/// its bracket and brace counts balance; the service is not trusted to return
/// bare JSON.
fn isolate_json_array(text: &str) -> &str {
    let first = match text.find('[') {
        Some(index) => index,
        None => return text,
    };
    let last = match text.rfind(']') {
        Some(index) => index,
        None => return text,
    };
    if last <= first {
        return text;
    }
    let span = &text[first..=last];
    let brackets_balanced =
        span.matches('[').count() == span.matches(']').count();
    let braces_balanced = span.matches('{').count() == span.matches('}').count();
    if brackets_balanced && braces_balanced {
        span
    } else {
        text
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

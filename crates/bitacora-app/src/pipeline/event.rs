//! Data model shared across extraction, orchestration, and reconciliation.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::vocabulary::{Action, Component};

/// One row of the source service-history table, read-only input.
///
/// The timestamp is carried verbatim from the source cell; it is parsed only
/// at the reconciliation boundary so the exported event table stays lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRow {
    pub device_id: String,
    pub timestamp: String,
    pub client: String,
    pub description: String,
}

/// Structured event extracted from one description.
///
/// Never constructed for an unknown component; such events are dropped during
/// normalization instead of being stored with a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEvent {
    pub component: Component,
    pub action: Action,
    /// Comma-joined when the source supplied several identifiers for one
    /// component-action pair; `None` when none was found.
    pub accessory_id: Option<String>,
}

/// Events recognised in a single input description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowEvents {
    pub events: Vec<ExtractedEvent>,
}

impl RowEvents {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// How a batch extraction concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchDisposition {
    /// Structurally valid result on some attempt.
    Clean { attempts: u32 },
    /// Wrong-length result accepted on the final attempt; the tail was padded
    /// with empty placeholders.
    Forced {
        received: usize,
        attempts: u32,
        last_error: String,
    },
    /// The service refused the content; not retried.
    Blocked { reason: String },
    /// Every attempt failed transiently; the whole batch degraded to
    /// placeholders.
    Exhausted { attempts: u32, last_error: String },
}

impl BatchDisposition {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, BatchDisposition::Clean { .. })
    }

    /// Operator-facing one-liner retained for the run summary.
    pub fn describe(&self) -> Option<String> {
        match self {
            BatchDisposition::Clean { .. } => None,
            BatchDisposition::Forced {
                received,
                last_error,
                ..
            } => Some(format!(
                "forced acceptance of {received} result(s): {last_error}"
            )),
            BatchDisposition::Blocked { reason } => Some(format!("content blocked: {reason}")),
            BatchDisposition::Exhausted { last_error, .. } => {
                Some(format!("retries exhausted: {last_error}"))
            }
        }
    }
}

/// Result of one batch call. `rows.len()` always equals the input batch size;
/// downstream row-to-event mapping is positional and depends on it.
#[derive(Debug, Clone)]
pub struct BatchExtraction {
    pub rows: Vec<RowEvents>,
    pub disposition: BatchDisposition,
}

/// Flattened event joined with its source row identity. Immutable once
/// created; accumulated into the full event table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub device_id: String,
    pub timestamp: String,
    pub client: String,
    pub component: Component,
    pub action: Action,
    pub accessory_id: Option<String>,
    pub original_description: String,
}

/// Wire shape of one per-description result object, Spanish keys per the
/// prompt contract.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRow {
    #[serde(default, rename = "eventos_detectados")]
    pub detected_events: Vec<WireEvent>,
}

/// Wire shape of one detected event. All fields are optional at this level;
/// validation and normalization happen in the extraction client.
#[derive(Debug, Clone, Deserialize)]
pub struct WireEvent {
    #[serde(default, rename = "componente")]
    pub component: Option<String>,
    #[serde(default, rename = "accion")]
    pub action: Option<String>,
    #[serde(default, rename = "accesorio_id")]
    pub accessory_id: Option<JsonValue>,
}

impl WireEvent {
    /// Flatten the accessory field: scalars become their trimmed string form,
    /// lists are comma-joined, blanks and nulls become `None`.
    pub fn accessory_id_string(&self) -> Option<String> {
        fn scalar(value: &JsonValue) -> Option<String> {
            match value {
                JsonValue::String(s) => {
                    let trimmed = s.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                }
                JsonValue::Number(n) => Some(n.to_string()),
                JsonValue::Bool(b) => Some(b.to_string()),
                _ => None,
            }
        }

        match self.accessory_id.as_ref()? {
            JsonValue::Null => None,
            JsonValue::Array(items) => {
                let parts: Vec<String> = items.iter().filter_map(scalar).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            other => scalar(other),
        }
    }
}

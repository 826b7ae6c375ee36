//! Contract tests for the extraction client: for every batch size N >= 1 and
//! every possible service response — malformed included — the result has
//! exactly N rows.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use bitacora_app::pipeline::event::BatchDisposition;
use bitacora_app::services::{
    ExtractionClient, GenerationClient, GenerationError, GenerationReply, RetryPolicy,
};
use bitacora_app::vocabulary::{Action, Component};

/// Plays back a fixed script of replies, one per `generate` call.
struct ScriptedClient {
    script: Mutex<VecDeque<Result<GenerationReply, GenerationError>>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(script: Vec<Result<GenerationReply, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, _prompt: &str) -> Result<GenerationReply, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::message("script exhausted")))
    }
}

fn text(reply: &str) -> Result<GenerationReply, GenerationError> {
    Ok(GenerationReply::Text(reply.to_string()))
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::ZERO,
    }
}

fn descriptions(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("descripcion {i}")).collect()
}

fn empty_row_array(n: usize) -> String {
    let rows: Vec<&str> = std::iter::repeat("{\"eventos_detectados\": []}")
        .take(n)
        .collect();
    format!("[{}]", rows.join(","))
}

#[tokio::test]
async fn result_length_matches_input_for_malformed_responses() {
    // Wrong-length (short, long, empty), and non-list JSON, for several N.
    for n in [1_usize, 3, 5] {
        let cases = vec![
            empty_row_array(n.saturating_sub(1)),
            empty_row_array(n + 1),
            "[]".to_string(),
            "{\"eventos_detectados\": []}".to_string(),
        ];
        for body in cases {
            let client = ScriptedClient::new(vec![
                text(&body),
                text(&body),
                text(&body),
            ]);
            let extractor = ExtractionClient::new(client.clone(), fast_policy());
            let result = extractor.extract(&descriptions(n)).await;
            assert_eq!(
                result.rows.len(),
                n,
                "N={n} body={body:?} must yield exactly N rows"
            );
        }
    }
}

#[tokio::test]
async fn clean_success_parses_and_normalizes() {
    let body = r#"[
        {"eventos_detectados": [
            {"componente": "gps", "accion": "se quito", "accesorio_id": "359632107908086"}
        ]},
        {"eventos_detectados": []}
    ]"#;
    let client = ScriptedClient::new(vec![text(body)]);
    let extractor = ExtractionClient::new(client.clone(), fast_policy());

    let result = extractor.extract(&descriptions(2)).await;

    assert_eq!(client.calls(), 1);
    assert!(matches!(
        result.disposition,
        BatchDisposition::Clean { attempts: 1 }
    ));
    let events = &result.rows[0].events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].component, Component::Gps);
    assert_eq!(events[0].action, Action::Uninstallation);
    assert_eq!(events[0].accessory_id.as_deref(), Some("359632107908086"));
    assert!(result.rows[1].is_empty());
}

#[tokio::test]
async fn code_fences_and_prose_are_tolerated() {
    let body = "Claro, aquí está:\n```json\n[{\"eventos_detectados\": []}]\n```\nSaludos.";
    let client = ScriptedClient::new(vec![text(body)]);
    let extractor = ExtractionClient::new(client, fast_policy());

    let result = extractor.extract(&descriptions(1)).await;
    assert!(matches!(result.disposition, BatchDisposition::Clean { .. }));
    assert_eq!(result.rows.len(), 1);
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let client = ScriptedClient::new(vec![
        Err(GenerationError::message("connection reset")),
        text("esto no es json"),
        text(&empty_row_array(2)),
    ]);
    let extractor = ExtractionClient::new(client.clone(), fast_policy());

    let result = extractor.extract(&descriptions(2)).await;

    assert_eq!(client.calls(), 3);
    assert!(matches!(
        result.disposition,
        BatchDisposition::Clean { attempts: 3 }
    ));
}

#[tokio::test]
async fn wrong_length_on_final_attempt_is_force_accepted() {
    // Service insists on one element for a three-element batch.
    let one_row = r#"[{"eventos_detectados": [
        {"componente": "power hub", "accion": "Instalacion", "accesorio_id": "868"}
    ]}]"#;
    let client = ScriptedClient::new(vec![text(one_row), text(one_row), text(one_row)]);
    let extractor = ExtractionClient::new(client.clone(), fast_policy());

    let result = extractor.extract(&descriptions(3)).await;

    assert_eq!(client.calls(), 3);
    assert_eq!(result.rows.len(), 3);
    assert!(matches!(
        result.disposition,
        BatchDisposition::Forced { received: 1, .. }
    ));
    assert_eq!(result.rows[0].events.len(), 1);
    assert_eq!(result.rows[0].events[0].component, Component::PowerHub);
    assert!(result.rows[1].is_empty());
    assert!(result.rows[2].is_empty());
}

#[tokio::test]
async fn content_block_is_terminal_and_not_retried() {
    let client = ScriptedClient::new(vec![Ok(GenerationReply::Blocked {
        reason: "prompt blocked: SAFETY".to_string(),
    })]);
    let extractor = ExtractionClient::new(client.clone(), fast_policy());

    let result = extractor.extract(&descriptions(4)).await;

    assert_eq!(client.calls(), 1, "a blocked batch must not be retried");
    assert_eq!(result.rows.len(), 4);
    assert!(result.rows.iter().all(|row| row.is_empty()));
    assert!(matches!(result.disposition, BatchDisposition::Blocked { .. }));
}

#[tokio::test]
async fn exhausted_retries_degrade_to_placeholders() {
    let client = ScriptedClient::new(vec![
        Err(GenerationError::message("timeout")),
        text(""),
        Err(GenerationError::message("timeout again")),
    ]);
    let extractor = ExtractionClient::new(client.clone(), fast_policy());

    let result = extractor.extract(&descriptions(2)).await;

    assert_eq!(client.calls(), 3);
    assert_eq!(result.rows.len(), 2);
    assert!(result.rows.iter().all(|row| row.is_empty()));
    match result.disposition {
        BatchDisposition::Exhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("timeout again"));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_components_are_dropped_not_placeholdered() {
    let body = r#"[{"eventos_detectados": [
        {"componente": "tornillo suelto", "accion": "Instalacion"},
        {"componente": "sirena", "accion": "Instalacion"}
    ]}]"#;
    let client = ScriptedClient::new(vec![text(body)]);
    let extractor = ExtractionClient::new(client, fast_policy());

    let result = extractor.extract(&descriptions(1)).await;
    let events = &result.rows[0].events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].component, Component::Sirena);
}

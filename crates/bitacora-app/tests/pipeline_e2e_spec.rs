//! End-to-end pipeline test: rows → batches → extraction → event table →
//! reconciliation, with a scripted generation backend.

use std::{
    collections::VecDeque,
    num::NonZeroUsize,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use bitacora_app::pipeline::event::ServiceRow;
use bitacora_app::pipeline::reconcile::reconcile;
use bitacora_app::services::{
    BatchOrchestrator, ExtractionClient, GenerationClient, GenerationError, GenerationReply,
    RetryPolicy,
};
use bitacora_app::vocabulary::{Action, Component};

struct ScriptedClient {
    script: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(replies: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(replies.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationReply, GenerationError> {
        self.prompts
            .lock()
            .expect("prompt log mutex poisoned")
            .push(prompt.to_string());
        let reply = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .ok_or_else(|| GenerationError::message("script exhausted"))?;
        Ok(GenerationReply::Text(reply))
    }
}

fn row(device: &str, timestamp: &str, client: &str, description: &str) -> ServiceRow {
    ServiceRow {
        device_id: device.to_string(),
        timestamp: timestamp.to_string(),
        client: client.to_string(),
        description: description.to_string(),
    }
}

fn orchestrator(client: Arc<ScriptedClient>, batch_size: usize) -> BatchOrchestrator {
    let retry = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::ZERO,
    };
    BatchOrchestrator::new(
        ExtractionClient::new(client, retry),
        NonZeroUsize::new(batch_size).expect("batch size"),
    )
}

#[tokio::test]
async fn three_rows_with_batch_size_two_produce_two_batches() {
    let first_batch = r#"[
        {"eventos_detectados": [
            {"componente": "GPS", "accion": "Desinstalacion", "accesorio_id": "123456789012345"}
        ]},
        {"eventos_detectados": [
            {"componente": "Power Hub", "accion": "Instalacion", "accesorio_id": "868"}
        ]}
    ]"#;
    let second_batch = r#"[{"eventos_detectados": []}]"#;
    let client = ScriptedClient::new(vec![first_batch, second_batch]);

    let rows = vec![
        row("868111", "2024-03-01", "Acme", "SE QUITO 123456789012345 Teltonika FMB920"),
        row("868112", "2024-03-02", "Acme", "SE PUSO POWER HUB #868"),
        row("868113", "2024-03-03", "Acme", "tornillo suelto"),
    ];

    let report = orchestrator(client.clone(), 2).run(&rows).await;

    assert_eq!(report.total_batches, 2);
    assert_eq!(report.processed_rows, 3);
    assert_eq!(report.events.len(), 2);

    let first = &report.events[0];
    assert_eq!(first.device_id, "868111");
    assert_eq!(first.component, Component::Gps);
    assert_eq!(first.action, Action::Uninstallation);
    assert_eq!(first.accessory_id.as_deref(), Some("123456789012345"));
    assert_eq!(first.original_description, "SE QUITO 123456789012345 Teltonika FMB920");

    let second = &report.events[1];
    assert_eq!(second.device_id, "868112");
    assert_eq!(second.component, Component::PowerHub);
    assert_eq!(second.action, Action::Installation);
    assert_eq!(second.accessory_id.as_deref(), Some("868"));

    // The irrelevant third row produced no events, so its single-row batch is
    // counted as fully empty.
    assert_eq!(report.degraded_batches, 1);

    // Prompts carried the right per-batch counts, in order.
    let prompts = client.prompts.lock().expect("prompt log");
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("lista de 2 descripciones"));
    assert!(prompts[0].contains("SE QUITO 123456789012345"));
    assert!(prompts[1].contains("lista de 1 descripciones"));
    assert!(prompts[1].contains("tornillo suelto"));
}

#[tokio::test]
async fn accumulated_events_survive_a_failing_later_batch() {
    let first_batch = r#"[
        {"eventos_detectados": [
            {"componente": "GPS", "accion": "Instalacion"}
        ]},
        {"eventos_detectados": []}
    ]"#;
    // Second batch never yields valid JSON; all three attempts fail.
    let client = ScriptedClient::new(vec![first_batch, "???", "???", "???"]);

    let rows = vec![
        row("D1", "2024-01-01", "C1", "instalacion de gps"),
        row("D2", "2024-01-02", "C1", "nada"),
        row("D3", "2024-01-03", "C1", "revision"),
    ];

    let report = orchestrator(client, 2).run(&rows).await;

    assert_eq!(report.total_batches, 2);
    assert_eq!(report.events.len(), 1, "first batch's events are kept");
    assert_eq!(report.degraded_batches, 1);
    assert!(report.last_failure.is_some());
}

#[tokio::test]
async fn extracted_events_reconcile_into_device_state() {
    let first_batch = r#"[
        {"eventos_detectados": [
            {"componente": "GPS", "accion": "Instalacion"},
            {"componente": "Sensor Combustible", "accion": "Instalacion"}
        ]},
        {"eventos_detectados": [
            {"componente": "GPS", "accion": "Desinstalacion"}
        ]}
    ]"#;
    let client = ScriptedClient::new(vec![first_batch]);

    let rows = vec![
        row("D1", "2024-01-01", "C1", "instalacion gps y sensor"),
        row("D1", "2024-02-01", "C1", "se retira equipo"),
    ];

    let report = orchestrator(client, 25).run(&rows).await;
    assert_eq!(report.events.len(), 3);

    let states = reconcile(&report.events);
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].client, "C1");
    assert_eq!(states[0].device_id, "D1");
    assert_eq!(states[0].installed_label(), "Sensor Combustible");
    assert_eq!(states[0].last_event_date(), "2024-02-01");
}

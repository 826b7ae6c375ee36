//! Sequential batch driver: partitions the row set, calls the extraction
//! client per batch, and flattens results into the event table.
//!
//! Batches run strictly one at a time. The generation service is the
//! bottleneck and is rate-limited per caller, so parallel batches would buy
//! little throughput at this scale while complicating partial results.

use std::{num::NonZeroUsize, time::Instant};

use indicatif::ProgressBar;

use crate::constants::{INTER_BATCH_PAUSE, INTER_BATCH_PAUSE_THRESHOLD};
use crate::pipeline::event::{EventRecord, ServiceRow};
use crate::services::extraction::ExtractionClient;

/// Explicit run-level result object threaded through the orchestrator;
/// there is no ambient mutable run state.
#[derive(Debug)]
pub struct RunReport {
    pub events: Vec<EventRecord>,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub total_batches: usize,
    /// Batches that degraded (retry exhaustion, content block, forced
    /// acceptance) or came back as all-empty placeholders — a signal of
    /// systemic failure, surfaced for operator visibility, never fatal.
    pub degraded_batches: usize,
    pub last_failure: Option<String>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "extracted {} event(s) from {} row(s) in {} batch(es) ({:.1}s)",
            self.events.len(),
            self.processed_rows,
            self.total_batches,
            self.elapsed_secs
        );
        if self.degraded_batches > 0 {
            line.push_str(&format!(
                "; {}/{} batch(es) degraded",
                self.degraded_batches, self.total_batches
            ));
            if let Some(failure) = &self.last_failure {
                line.push_str(&format!(" (last error: {failure})"));
            }
        }
        line
    }
}

pub struct BatchOrchestrator {
    extractor: ExtractionClient,
    batch_size: NonZeroUsize,
    progress: Option<ProgressBar>,
}

impl BatchOrchestrator {
    pub fn new(extractor: ExtractionClient, batch_size: NonZeroUsize) -> Self {
        Self {
            extractor,
            batch_size,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Process every row, batch by batch, and emit one `EventRecord` per
    /// extracted event annotated with its source row identity.
    ///
    /// Already-accumulated records survive later batch failures; a degraded
    /// batch contributes placeholders, not an abort.
    pub async fn run(&self, rows: &[ServiceRow]) -> RunReport {
        let batch_size = self.batch_size.get();
        let total_rows = rows.len();
        let total_batches = total_rows.div_ceil(batch_size);
        let started = Instant::now();

        if let Some(progress) = &self.progress {
            progress.set_length(total_rows as u64);
        }
        tracing::info!(
            event = "run_start",
            total_rows,
            total_batches,
            batch_size,
            "starting extraction run"
        );

        let mut events: Vec<EventRecord> = Vec::new();
        let mut processed_rows = 0_usize;
        let mut degraded_batches = 0_usize;
        let mut last_failure: Option<String> = None;

        for (batch_index, batch) in rows.chunks(batch_size).enumerate() {
            let batch_number = batch_index + 1;
            let batch_started = Instant::now();
            let descriptions: Vec<String> =
                batch.iter().map(|row| row.description.clone()).collect();

            tracing::info!(
                event = "batch_start",
                batch = batch_number,
                total_batches,
                size = batch.len(),
                "processing batch"
            );

            let result = self.extractor.extract(&descriptions).await;

            // The extraction contract guarantees positional alignment; check
            // it at this boundary instead of assuming it.
            if result.rows.len() != batch.len() {
                tracing::error!(
                    event = "batch_misaligned",
                    batch = batch_number,
                    expected = batch.len(),
                    received = result.rows.len(),
                    "batch result misaligned; skipping batch"
                );
                degraded_batches += 1;
                last_failure = Some(format!(
                    "batch {batch_number} result misaligned: expected {}, got {}",
                    batch.len(),
                    result.rows.len()
                ));
                processed_rows += batch.len();
                self.bump_progress(batch.len());
                continue;
            }

            let fully_empty = result.rows.iter().all(|row| row.is_empty());
            if result.disposition.is_degraded() || (!batch.is_empty() && fully_empty) {
                degraded_batches += 1;
                if let Some(description) = result.disposition.describe() {
                    tracing::warn!(
                        event = "batch_degraded",
                        batch = batch_number,
                        error = %description,
                        "batch degraded"
                    );
                    last_failure = Some(description);
                } else {
                    tracing::info!(
                        event = "batch_empty",
                        batch = batch_number,
                        "batch produced no events for any row"
                    );
                }
            }

            for (row, row_events) in batch.iter().zip(result.rows.iter()) {
                for event in &row_events.events {
                    events.push(EventRecord {
                        device_id: row.device_id.clone(),
                        timestamp: row.timestamp.clone(),
                        client: row.client.clone(),
                        component: event.component,
                        action: event.action,
                        accessory_id: event.accessory_id.clone(),
                        original_description: row.description.clone(),
                    });
                }
            }

            processed_rows += batch.len();
            self.bump_progress(batch.len());

            let batch_elapsed = batch_started.elapsed();
            let total_elapsed = started.elapsed();
            let remaining = total_batches.saturating_sub(batch_number);
            let eta_secs = if batch_number > 0 && remaining > 0 {
                total_elapsed.as_secs_f64() / batch_number as f64 * remaining as f64
            } else {
                0.0
            };
            tracing::info!(
                event = "batch_complete",
                batch = batch_number,
                total_batches,
                batch_secs = batch_elapsed.as_secs_f64(),
                eta_secs,
                events = events.len(),
                "batch complete"
            );

            if remaining > 0 && batch_size > INTER_BATCH_PAUSE_THRESHOLD {
                tokio::time::sleep(INTER_BATCH_PAUSE).await;
            }
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        let report = RunReport {
            events,
            total_rows,
            processed_rows,
            total_batches,
            degraded_batches,
            last_failure,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        tracing::info!(
            event = "run_complete",
            events = report.events.len(),
            degraded = report.degraded_batches,
            total_batches = report.total_batches,
            "extraction run complete"
        );
        report
    }

    fn bump_progress(&self, rows: usize) {
        if let Some(progress) = &self.progress {
            progress.inc(rows as u64);
        }
    }
}

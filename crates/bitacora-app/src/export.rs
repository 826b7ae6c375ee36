//! Event-table and state-table CSV writers, plus the event-table reader used
//! to replay a previously exported run.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::pipeline::event::EventRecord;
use crate::pipeline::reconcile::DeviceState;
use crate::vocabulary::{Action, Component};

pub const EVENT_HEADERS: [&str; 7] = [
    "device_id",
    "timestamp",
    "client",
    "component",
    "action",
    "accessory_id",
    "original_description",
];

pub const STATE_HEADERS: [&str; 4] = [
    "client",
    "device_id",
    "installed_components",
    "last_event_timestamp",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("event table is missing column `{name}`")]
    MissingColumn { name: String },
}

/// Write the flattened event table, one row per extracted event,
/// chronologically unordered as produced.
pub fn write_events(path: &Path, events: &[EventRecord]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path).map_err(|err| io_error(path, err))?;
    writer.write_record(EVENT_HEADERS)?;
    for event in events {
        writer.write_record([
            event.device_id.as_str(),
            event.timestamp.as_str(),
            event.client.as_str(),
            event.component.label(),
            event.action.label(),
            event.accessory_id.as_deref().unwrap_or(""),
            event.original_description.as_str(),
        ])?;
    }
    writer.flush().map_err(|err| ExportError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    Ok(())
}

/// Write the current-state table, one row per (client, device) pair.
pub fn write_states(path: &Path, states: &[DeviceState]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path).map_err(|err| io_error(path, err))?;
    writer.write_record(STATE_HEADERS)?;
    for state in states {
        writer.write_record([
            state.client.as_str(),
            state.device_id.as_str(),
            state.installed_label().as_str(),
            state.last_event_date().as_str(),
        ])?;
    }
    writer.flush().map_err(|err| ExportError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    Ok(())
}

/// Read a previously exported event table back into records.
///
/// Component and action cells that no longer resolve are tolerated: the
/// component becomes the `Unknown` sentinel (dropped during reconciliation)
/// and the action falls back through the normal keyword resolution.
pub fn read_events(path: &Path) -> Result<Vec<EventRecord>, ExportError> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| io_error(path, err))?;
    let headers = reader.headers()?.clone();
    let index_of = |name: &str| -> Result<usize, ExportError> {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| ExportError::MissingColumn {
                name: name.to_string(),
            })
    };

    let device_idx = index_of(EVENT_HEADERS[0])?;
    let timestamp_idx = index_of(EVENT_HEADERS[1])?;
    let client_idx = index_of(EVENT_HEADERS[2])?;
    let component_idx = index_of(EVENT_HEADERS[3])?;
    let action_idx = index_of(EVENT_HEADERS[4])?;
    let accessory_idx = index_of(EVENT_HEADERS[5])?;
    let description_idx = index_of(EVENT_HEADERS[6])?;

    let mut events = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        let accessory = cell(accessory_idx);
        events.push(EventRecord {
            device_id: cell(device_idx),
            timestamp: cell(timestamp_idx),
            client: cell(client_idx),
            component: Component::from_label(record.get(component_idx).unwrap_or_default())
                .unwrap_or(Component::Unknown),
            action: Action::from_str(record.get(action_idx).unwrap_or_default())
                .unwrap_or_else(|_| {
                    crate::pipeline::normalize::normalize_action(
                        record.get(action_idx).unwrap_or_default(),
                    )
                }),
            accessory_id: (!accessory.is_empty()).then_some(accessory),
            original_description: cell(description_idx),
        });
    }
    Ok(events)
}

fn io_error(path: &Path, err: csv::Error) -> ExportError {
    ExportError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(err.to_string()),
    }
}

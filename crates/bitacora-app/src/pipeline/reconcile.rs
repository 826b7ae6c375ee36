//! Chronological replay of the event table into per-device installed state.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::pipeline::event::EventRecord;
use crate::vocabulary::{Action, Component};

/// Rendering of the empty installed set; distinguishes "nothing installed"
/// from "no data" in exported tables.
pub const EMPTY_INSTALLED_SET: &str = "None";

/// Current state of one (client, device) pair after replaying its history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub client: String,
    pub device_id: String,
    pub installed: BTreeSet<Component>,
    pub last_event_time: NaiveDateTime,
}

impl DeviceState {
    /// Installed components as a sorted, comma-joined label string, with the
    /// explicit sentinel for the empty set.
    pub fn installed_label(&self) -> String {
        if self.installed.is_empty() {
            return EMPTY_INSTALLED_SET.to_string();
        }
        let mut labels: Vec<&str> = self.installed.iter().map(|c| c.label()).collect();
        labels.sort_unstable();
        labels.join(", ")
    }

    /// Last event timestamp rendered as an ISO date.
    pub fn last_event_date(&self) -> String {
        self.last_event_time.format("%Y-%m-%d").to_string()
    }
}

/// Replay the accumulated event table into one `DeviceState` per
/// (client, device_id) pair.
///
/// Records with an empty device id or client, an unknown component, or an
/// unparseable timestamp cannot participate in ordering and are dropped.
/// Remaining records are sorted by (client, device_id, timestamp); the sort
/// is stable, so identical timestamps keep their input order. Pure function
/// of its input: replaying the same list twice yields the same states.
pub fn reconcile(events: &[EventRecord]) -> Vec<DeviceState> {
    let mut ordered: Vec<(&EventRecord, NaiveDateTime)> = events
        .iter()
        .filter(|record| {
            !record.device_id.trim().is_empty()
                && !record.client.trim().is_empty()
                && record.component != Component::Unknown
        })
        .filter_map(|record| parse_timestamp(&record.timestamp).map(|ts| (record, ts)))
        .collect();

    ordered.sort_by(|(a, ta), (b, tb)| {
        (a.client.as_str(), a.device_id.as_str(), *ta).cmp(&(
            b.client.as_str(),
            b.device_id.as_str(),
            *tb,
        ))
    });

    let mut states: Vec<DeviceState> = Vec::new();
    for (record, timestamp) in ordered {
        let needs_new_group = states.last().map_or(true, |state| {
            state.client != record.client || state.device_id != record.device_id
        });
        if needs_new_group {
            states.push(DeviceState {
                client: record.client.clone(),
                device_id: record.device_id.clone(),
                installed: BTreeSet::new(),
                last_event_time: timestamp,
            });
        }
        let state = states.last_mut().expect("group pushed above");

        match record.action {
            Action::Installation => {
                state.installed.insert(record.component);
            }
            // Removing an absent component is a no-op by contract.
            Action::Uninstallation => {
                state.installed.remove(&record.component);
            }
            // Present before and after; net effect identical to installation.
            Action::Replacement => {
                state.installed.insert(record.component);
            }
            Action::Inspection | Action::TankMeasurement => {}
        }
        if timestamp > state.last_event_time {
            state.last_event_time = timestamp;
        }
    }

    states
}

/// Tolerant timestamp parsing over the formats observed in exported service
/// logs. Returns `None` when no format applies.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        client: &str,
        device: &str,
        timestamp: &str,
        component: Component,
        action: Action,
    ) -> EventRecord {
        EventRecord {
            device_id: device.to_string(),
            timestamp: timestamp.to_string(),
            client: client.to_string(),
            component,
            action,
            accessory_id: None,
            original_description: String::new(),
        }
    }

    #[test]
    fn install_uninstall_replace_scenario() {
        let events = vec![
            record("C1", "D1", "2024-01-01", Component::Gps, Action::Installation),
            record(
                "C1",
                "D1",
                "2024-01-02",
                Component::SensorCombustible,
                Action::Installation,
            ),
            record("C1", "D1", "2024-01-03", Component::Gps, Action::Uninstallation),
            record(
                "C1",
                "D1",
                "2024-01-04",
                Component::SensorCombustible,
                Action::Replacement,
            ),
        ];

        let states = reconcile(&events);
        assert_eq!(states.len(), 1);
        let state = &states[0];
        assert_eq!(state.installed_label(), "Sensor Combustible");
        assert_eq!(state.last_event_date(), "2024-01-04");
    }

    #[test]
    fn uninstalling_absent_component_is_noop() {
        let events = vec![record(
            "C1",
            "D1",
            "2024-03-01",
            Component::Gps,
            Action::Uninstallation,
        )];
        let states = reconcile(&events);
        assert_eq!(states.len(), 1);
        assert!(states[0].installed.is_empty());
        assert_eq!(states[0].installed_label(), EMPTY_INSTALLED_SET);
    }

    #[test]
    fn neutral_actions_do_not_mutate_state() {
        let events = vec![
            record("C1", "D1", "2024-01-01", Component::Gps, Action::Installation),
            record("C1", "D1", "2024-01-05", Component::Gps, Action::Inspection),
            record(
                "C1",
                "D1",
                "2024-01-06",
                Component::SensorCombustible,
                Action::TankMeasurement,
            ),
        ];
        let states = reconcile(&events);
        assert_eq!(states[0].installed_label(), "GPS");
        assert_eq!(states[0].last_event_date(), "2024-01-06");
    }

    #[test]
    fn replay_is_idempotent() {
        let events = vec![
            record("C1", "D1", "2024-01-01 10:00:00", Component::Gps, Action::Installation),
            record("C2", "D2", "2024-01-02", Component::PowerHub, Action::Installation),
            record("C1", "D1", "2024-02-01 09:30:00", Component::Gps, Action::Uninstallation),
        ];
        assert_eq!(reconcile(&events), reconcile(&events));
    }

    #[test]
    fn events_are_replayed_in_timestamp_order_not_input_order() {
        let events = vec![
            record("C1", "D1", "2024-05-02", Component::Gps, Action::Uninstallation),
            record("C1", "D1", "2024-05-01", Component::Gps, Action::Installation),
        ];
        let states = reconcile(&events);
        assert!(states[0].installed.is_empty());
    }

    #[test]
    fn identical_timestamps_keep_input_order() {
        let events = vec![
            record("C1", "D1", "2024-05-01", Component::Gps, Action::Installation),
            record("C1", "D1", "2024-05-01", Component::Gps, Action::Uninstallation),
        ];
        let states = reconcile(&events);
        assert!(states[0].installed.is_empty());
    }

    #[test]
    fn malformed_records_are_dropped() {
        let events = vec![
            record("", "D1", "2024-01-01", Component::Gps, Action::Installation),
            record("C1", "", "2024-01-01", Component::Gps, Action::Installation),
            record("C1", "D1", "not a date", Component::Gps, Action::Installation),
            record("C1", "D1", "2024-01-01", Component::Unknown, Action::Installation),
            record("C1", "D1", "2024-01-02", Component::Sirena, Action::Installation),
        ];
        let states = reconcile(&events);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].installed_label(), "Sirena");
    }

    #[test]
    fn groups_are_keyed_by_client_and_device() {
        let events = vec![
            record("C1", "D1", "2024-01-01", Component::Gps, Action::Installation),
            record("C2", "D1", "2024-01-01", Component::PowerHub, Action::Installation),
        ];
        let states = reconcile(&events);
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn timestamp_formats_are_tolerated() {
        assert!(parse_timestamp("2024-06-01").is_some());
        assert!(parse_timestamp("2024-06-01 13:45:10").is_some());
        assert!(parse_timestamp("2024-06-01T13:45:10").is_some());
        assert!(parse_timestamp("01/06/2024 13:45").is_some());
        assert!(parse_timestamp("01/06/2024").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("mañana").is_none());
    }
}

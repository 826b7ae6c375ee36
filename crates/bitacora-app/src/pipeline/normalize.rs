//! Synonym resolution for component and action phrases.
//!
//! Both functions are total: any input, including empty or garbage text,
//! yields a usable value. Unrecognised components resolve to the `Unknown`
//! sentinel (the caller drops those events); unrecognised actions fall back
//! to the neutral `Inspection` so the pipeline is never blocked by phrasing.

use crate::vocabulary::{
    keywords_for, synonyms_longest_first, Action, Component, ACTION_PRIORITY, SYNONYMS,
};
use strum::IntoEnumIterator;

/// Resolve a free-text component phrase to its canonical component.
///
/// Lookup order: exact synonym hit on the folded text, then a longest-first
/// whole-word scan over the synonym table (so "gps portatil" wins over
/// "gps"), then a case-insensitive match against the canonical labels
/// themselves. Whole-word matching prevents partial hits such as "can"
/// inside "scanner".
pub fn normalize_component(raw: &str) -> Component {
    let folded = fold(raw);
    if folded.is_empty() {
        return Component::Unknown;
    }

    if let Some((_, component)) = SYNONYMS.iter().find(|(key, _)| *key == folded) {
        return *component;
    }

    for (key, component) in synonyms_longest_first() {
        if contains_whole_word(&folded, key) {
            return *component;
        }
    }

    for component in Component::canonical() {
        if component.label().to_lowercase() == folded {
            return component;
        }
    }

    Component::Unknown
}

/// Resolve a free-text action phrase to one of the five canonical actions.
///
/// Exact label match first, then keyword membership in priority order;
/// anything unrecognised defaults to the neutral `Inspection`.
pub fn normalize_action(raw: &str) -> Action {
    let folded = fold(raw);
    if folded.is_empty() {
        return Action::Inspection;
    }

    for action in Action::iter() {
        if action.label().to_lowercase() == folded {
            return action;
        }
    }

    for action in ACTION_PRIORITY {
        if keywords_for(action).iter().any(|kw| folded.contains(kw)) {
            return action;
        }
    }

    Action::Inspection
}

/// Lower-case and collapse all interior whitespace to single spaces.
fn fold(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `needle` occurs in `haystack` delimited by non-alphanumeric
/// characters (or the string edges) on both sides.
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut offset = 0;
    while let Some(found) = haystack[offset..].find(needle) {
        let begin = offset + found;
        let end = begin + needle.len();
        let left_boundary = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |ch| !ch.is_alphanumeric());
        let right_boundary = haystack[end..]
            .chars()
            .next()
            .map_or(true, |ch| !ch.is_alphanumeric());
        if left_boundary && right_boundary {
            return true;
        }
        match haystack[begin..].char_indices().nth(1) {
            Some((step, _)) => offset = begin + step,
            None => break,
        }
    }
    false
}

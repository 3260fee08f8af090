//! Decoding of key-value store snapshots into typed cards.
//!
//! A snapshot is a JSON object keyed by card id:
//! `{ "<key>": { "type": "event", "title": ..., ... }, ... }`.
//! The map key is authoritative for `Card::id`.

use crate::model::card::Card;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum SnapshotError {
    /// The document is not valid JSON.
    Json(serde_json::Error),
    /// The document root is not an object (or null).
    NotAnObject,
    /// One entry does not have the card shape.
    InvalidCard {
        key: String,
        source: serde_json::Error,
    },
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "snapshot is not valid JSON: {err}"),
            Self::NotAnObject => write!(f, "snapshot root must be an object keyed by card id"),
            Self::InvalidCard { key, source } => write!(f, "card `{key}` is malformed: {source}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) | Self::InvalidCard { source: err, .. } => Some(err),
            Self::NotAnObject => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Decodes a snapshot. A `null` root or `null` entries (deleted keys) are
/// skipped.
pub fn decode_cards(raw: &str) -> Result<Vec<Card>, SnapshotError> {
    let root: Value = serde_json::from_str(raw)?;
    let entries = match root {
        Value::Null => return Ok(Vec::new()),
        Value::Object(entries) => entries,
        _ => return Err(SnapshotError::NotAnObject),
    };

    let mut cards = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if value.is_null() {
            continue;
        }
        let mut card: Card = serde_json::from_value(value)
            .map_err(|source| SnapshotError::InvalidCard {
                key: key.clone(),
                source,
            })?;
        card.id = key;
        cards.push(card);
    }
    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::{decode_cards, SnapshotError};
    use crate::model::card::{CardStatus, CardType, Severity};

    #[test]
    fn keys_become_ids_and_missing_fields_default() {
        let cards = decode_cards(
            r#"{
                "-Nx1": {"type":"event","title":"fall","severity":"severe","date":"2024-01-01","status":"doing","eventCode":"EV-1"},
                "-Nx2": {"type":"task","title":"audit"},
                "-Nx3": null
            }"#,
        )
        .unwrap();
        assert_eq!(cards.len(), 2);

        let event = cards.iter().find(|card| card.id == "-Nx1").unwrap();
        assert_eq!(event.kind, CardType::Event);
        assert_eq!(event.severity, Severity::Severe);
        assert_eq!(event.status, CardStatus::Doing);
        assert_eq!(event.pct.event_code.as_deref(), Some("EV-1"));

        let task = cards.iter().find(|card| card.id == "-Nx2").unwrap();
        assert_eq!(task.status, CardStatus::Backlog);
        assert_eq!(task.severity, Severity::Unclassified);
    }

    #[test]
    fn null_snapshot_is_empty_and_arrays_are_rejected() {
        assert!(decode_cards("null").unwrap().is_empty());
        assert!(matches!(
            decode_cards("[1,2]"),
            Err(SnapshotError::NotAnObject)
        ));
    }

    #[test]
    fn malformed_entry_names_its_key() {
        let err = decode_cards(r#"{"bad":{"status":"archived"}}"#).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidCard { ref key, .. } if key == "bad"));
    }
}

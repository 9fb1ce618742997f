use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Unique identifier for a note.
///
/// Generated once at creation time and never changed afterwards. Serialized as
/// the hyphenated UUID string so that it doubles as the artifact file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    pub fn get(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_id_serializes_as_hyphenated_string() {
        let id: NoteId = "11111111-2222-4333-8444-555555555555".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""11111111-2222-4333-8444-555555555555""#);

        let deserialized: NoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(NoteId::generate(), NoteId::generate());
    }

    #[test]
    fn parsing_rejects_non_uuid_strings() {
        assert!("note-1".parse::<NoteId>().is_err());
        assert!(serde_json::from_str::<NoteId>(r#""1""#).is_err());
    }

    #[test]
    fn display_matches_parse_input() {
        let raw = "00000000-0000-4000-8000-000000000000";
        let id: NoteId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }
}

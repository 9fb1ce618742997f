use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::atomic::write_file_atomic;
use crate::error::{NotesError, Result};
use crate::models::{NoteId, NoteMetadata};

/// File name of the JSON index inside the storage root.
pub const INDEX_FILENAME: &str = "notes.index.json";

/// Every note's metadata, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteIndex {
    pub notes: Vec<NoteMetadata>,
}

impl NoteIndex {
    pub fn find(&self, id: NoteId) -> Option<&NoteMetadata> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// Replaces the record with the same id. Returns false if there was none.
    pub fn replace(&mut self, updated: NoteMetadata) -> bool {
        match self.notes.iter_mut().find(|note| note.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    /// Validates every record and rejects duplicate ids.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for note in &self.notes {
            note.validate()?;
            if !ids.insert(note.id) {
                return Err(NotesError::validation(format!("duplicate note id {}", note.id)));
            }
        }
        Ok(())
    }
}

/// Load-whole / save-whole persistence for the note index.
///
/// Implementations must make `save` atomic: a concurrent `load` observes
/// either the previous or the new index, never a mix.
pub trait IndexRepository: Send + Sync {
    /// Creates an empty index if none exists. Idempotent.
    fn initialize(&self) -> Result<()>;

    /// Reads the full index.
    ///
    /// # Errors
    ///
    /// `NotesError::CorruptIndex` if the stored index cannot be parsed or
    /// fails validation; `NotesError::Io` if it cannot be read.
    fn load(&self) -> Result<NoteIndex>;

    /// Replaces the full index.
    ///
    /// # Errors
    ///
    /// `NotesError::Validation` if `index` breaks a record invariant, in which
    /// case nothing is written.
    fn save(&self, index: &NoteIndex) -> Result<()>;
}

/// Index stored as a pretty-printed JSON document `{ "notes": [...] }`.
#[derive(Debug, Clone)]
pub struct JsonIndexFile {
    path: PathBuf,
}

impl JsonIndexFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl ToString) -> NotesError {
        NotesError::CorruptIndex {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl IndexRepository for JsonIndexFile {
    fn initialize(&self) -> Result<()> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("creating empty index at {}", self.path.display());
                self.save(&NoteIndex::default())
            }
            Err(e) => Err(NotesError::io(&self.path, e)),
        }
    }

    fn load(&self) -> Result<NoteIndex> {
        let raw = fs::read_to_string(&self.path).map_err(|e| NotesError::io(&self.path, e))?;
        let index: NoteIndex = serde_json::from_str(&raw).map_err(|e| self.corrupt(e))?;
        index.validate().map_err(|e| match e {
            NotesError::Validation(reason) => self.corrupt(reason),
            other => other,
        })?;
        Ok(index)
    }

    fn save(&self, index: &NoteIndex) -> Result<()> {
        index.validate()?;
        let json = serde_json::to_string_pretty(index).map_err(NotesError::Serialization)?;
        write_file_atomic(&self.path, json.as_bytes())
    }
}

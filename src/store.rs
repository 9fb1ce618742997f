//! File-backed note storage.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/notes.index.json   metadata of every note (the source of truth)
//! <root>/<id>.md            rendered markdown, regenerated on every write
//! <root>/raw/<id>.txt       raw body, canonical
//! <root>/figures/           diagram assets referenced from markdown
//! ```
//!
//! Every file is replaced atomically. There are no locks: two concurrent
//! updates of the same note race, and the last index write wins.

mod atomic;
mod index;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use time::OffsetDateTime;

use crate::autotagger::TagNormalizer;
use crate::error::{NotesError, Result};
use crate::markdown::NoteMarkdown;
use crate::models::{NoteContent, NoteId, NoteMetadata, NoteMetadataBuilder};
use crate::search;

use atomic::write_file_atomic;
pub use index::{INDEX_FILENAME, IndexRepository, JsonIndexFile, NoteIndex};

const RAW_DIR: &str = "raw";
const FIGURES_DIR: &str = "figures";

/// Fields of a new note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateNoteInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub source_conversation_id: Option<String>,
}

impl CreateNoteInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn source_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.source_conversation_id = Some(id.into());
        self
    }
}

/// Changes to an existing note. `None` fields keep their stored value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateNoteInput {
    pub id: NoteId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub source_conversation_id: Option<String>,
}

impl UpdateNoteInput {
    pub fn new(id: NoteId) -> Self {
        Self {
            id,
            title: None,
            content: None,
            tags: None,
            summary: None,
            source_conversation_id: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn source_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.source_conversation_id = Some(id.into());
        self
    }
}

/// Coarse store-level filter: tag intersection, then substring match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub tags: Vec<String>,
}

/// Durable per-note storage backed by flat files.
///
/// # Examples
///
/// ```no_run
/// use chappy_notes::store::{CreateNoteInput, FileNoteStore};
///
/// # fn main() -> chappy_notes::Result<()> {
/// let store = FileNoteStore::open("data/notes")?;
/// let note = store.create_note(CreateNoteInput::new("T", "C").tags(["Test", "HELLO"]))?;
/// assert_eq!(note.tags(), ["test", "hello"]);
/// # Ok(())
/// # }
/// ```
pub struct FileNoteStore {
    root: PathBuf,
    raw_dir: PathBuf,
    figures_dir: PathBuf,
    index: Box<dyn IndexRepository>,
}

impl FileNoteStore {
    /// Creates a store rooted at `root` using the JSON index file.
    ///
    /// Nothing touches the filesystem until [`FileNoteStore::init`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let index = JsonIndexFile::new(root.join(INDEX_FILENAME));
        Self::with_index_repository(root, Box::new(index))
    }

    /// Creates a store that keeps its index in `index`.
    pub fn with_index_repository(root: impl Into<PathBuf>, index: Box<dyn IndexRepository>) -> Self {
        let root = root.into();
        Self {
            raw_dir: root.join(RAW_DIR),
            figures_dir: root.join(FIGURES_DIR),
            root,
            index,
        }
    }

    /// Creates and initializes a store in one step.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        store.init()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn figures_dir(&self) -> &Path {
        &self.figures_dir
    }

    /// Ensures the directory layout and an index exist. Idempotent.
    pub fn init(&self) -> Result<()> {
        for dir in [&self.root, &self.figures_dir, &self.raw_dir] {
            fs::create_dir_all(dir).map_err(|e| NotesError::io(dir, e))?;
        }
        self.index.initialize()?;
        log::debug!("note store ready at {}", self.root.display());
        Ok(())
    }

    /// Stores a new note under a fresh id.
    ///
    /// Tags are normalized and deduplicated. Both artifacts are written before
    /// the index entry is appended.
    ///
    /// # Errors
    ///
    /// `NotesError::Validation` if the resulting metadata is invalid (nothing
    /// is written in that case); I/O and index errors otherwise.
    pub fn create_note(&self, input: CreateNoteInput) -> Result<NoteContent> {
        let id = NoteId::generate();
        let tags = TagNormalizer::normalize_tags(input.tags.unwrap_or_default());
        let metadata = NoteMetadataBuilder::new(id, input.title)
            .tags(tags)
            .source_conversation_id(input.source_conversation_id)
            .summary(input.summary)
            .content_path(self.content_file_path(id))
            .created_at(OffsetDateTime::now_utc())
            .build();
        metadata.validate()?;

        let note = NoteContent::new(metadata, input.content);
        self.write_artifacts(&note)?;
        self.update_index(|index| index.notes.push(note.metadata.clone()))?;

        log::info!("created note {} ({})", note.id(), note.title());
        Ok(note)
    }

    /// Merges `input` over the stored note and rewrites its artifacts.
    ///
    /// Returns `Ok(None)` if no note has the given id. `updatedAt` is bumped on
    /// every call; `id` and `createdAt` never change. Without new content the
    /// stored raw body is reused, so metadata-only updates keep the body but
    /// still regenerate the markdown.
    ///
    /// The lookup and the index write are separate reads of the index, so two
    /// concurrent updates of one note may overwrite each other.
    pub fn update_note(&self, input: UpdateNoteInput) -> Result<Option<NoteContent>> {
        let index = self.index.load()?;
        let Some(existing) = index.find(input.id) else {
            return Ok(None);
        };

        let mut updated = existing.clone();
        if let Some(title) = input.title {
            updated.title = title;
        }
        if let Some(tags) = input.tags {
            updated.tags = TagNormalizer::normalize_tags(tags);
        }
        if input.summary.is_some() {
            updated.summary = input.summary;
        }
        if input.source_conversation_id.is_some() {
            updated.source_conversation_id = input.source_conversation_id;
        }
        updated.updated_at = OffsetDateTime::now_utc().max(existing.created_at);
        updated.validate()?;

        let content = match input.content {
            Some(content) => content,
            None => self.read_content(existing)?,
        };

        let note = NoteContent::new(updated, content);
        self.write_artifacts(&note)?;
        self.update_index(|index| {
            if !index.replace(note.metadata.clone()) {
                log::warn!("note {} vanished from the index during update", note.id());
            }
        })?;

        log::info!("updated note {}", note.id());
        Ok(Some(note))
    }

    /// Returns the note with its raw body, or `None` if the id is unknown.
    pub fn get_note(&self, id: NoteId) -> Result<Option<NoteContent>> {
        let index = self.index.load()?;
        let Some(metadata) = index.find(id) else {
            return Ok(None);
        };
        let content = self.read_content(metadata)?;
        Ok(Some(NoteContent::new(metadata.clone(), content)))
    }

    /// Returns every note, most recently updated first.
    ///
    /// Notes with the same `updatedAt` keep reverse index order, so the later
    /// addition comes first.
    pub fn list_notes(&self) -> Result<Vec<NoteMetadata>> {
        let mut notes = self.index.load()?.notes;
        notes.reverse();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    /// Filters notes by tag intersection and, if a query is given, by a
    /// case-insensitive substring in the title, summary or raw body.
    ///
    /// Results are in index order; ranking is the caller's job.
    pub fn search_notes(&self, query: &SearchQuery) -> Result<Vec<NoteMetadata>> {
        let index = self.index.load()?;
        let tags = TagNormalizer::normalize_tags(&query.tags);
        let candidates = search::filter_by_tags(index.notes, &tags);

        match query.query.as_deref().filter(|q| !q.is_empty()) {
            None => Ok(candidates),
            Some(needle) => {
                search::full_text_search(candidates, needle, |note| self.read_content(note))
            }
        }
    }

    fn update_index(&self, apply: impl FnOnce(&mut NoteIndex)) -> Result<()> {
        let mut index = self.index.load()?;
        apply(&mut index);
        self.index.save(&index)
    }

    fn write_artifacts(&self, note: &NoteContent) -> Result<()> {
        let markdown = NoteMarkdown::for_note(note).render();
        let markdown_path = self.resolve_content_path(&note.metadata.content_path);
        write_file_atomic(&markdown_path, markdown.as_bytes())?;
        write_file_atomic(&self.raw_file_path(note.id()), note.content.as_bytes())
    }

    /// Reads a note's raw body, falling back to the markdown artifact if the raw file is gone.
    pub fn read_content(&self, metadata: &NoteMetadata) -> Result<String> {
        let raw_path = self.raw_file_path(metadata.id);
        match fs::read_to_string(&raw_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let markdown_path = self.resolve_content_path(&metadata.content_path);
                log::warn!(
                    "raw content for note {} missing, reading {}",
                    metadata.id,
                    markdown_path.display()
                );
                fs::read_to_string(&markdown_path).map_err(|e| NotesError::io(&markdown_path, e))
            }
            Err(e) => Err(NotesError::io(&raw_path, e)),
        }
    }

    fn raw_file_path(&self, id: NoteId) -> PathBuf {
        self.raw_dir.join(format!("{id}.txt"))
    }

    fn content_file_path(&self, id: NoteId) -> PathBuf {
        self.root.join(format!("{id}.md"))
    }

    /// Relative content paths are resolved against the storage root.
    fn resolve_content_path(&self, content_path: &Path) -> PathBuf {
        if content_path.is_absolute() {
            content_path.to_path_buf()
        } else {
            self.root.join(content_path)
        }
    }
}

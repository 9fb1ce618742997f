use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::NoteId;
use crate::autotagger::TagNormalizer;
use crate::error::{NotesError, Result};

/// Maximum title length, in characters.
pub const TITLE_MAX_LENGTH: usize = 180;
/// Maximum number of tags carried by a note or a request.
pub const TAG_MAX_COUNT: usize = 10;
/// Maximum length of a single normalized tag, in characters.
pub const TAG_MAX_LENGTH: usize = 32;

/// Identity and indexable attributes of a note.
///
/// One record per note lives in the index file. The index is the single source
/// of truth for which notes exist; the raw and markdown artifacts are keyed by
/// `id` and derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_conversation_id: Option<String>,
    /// Location of the rendered markdown artifact.
    pub content_path: PathBuf,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl NoteMetadata {
    /// Checks the invariants every persisted record must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::Validation` describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_tag_count(self.tags.len())?;

        let mut seen = HashSet::new();
        for tag in &self.tags {
            if !is_valid_tag(tag) {
                return Err(NotesError::validation(format!(
                    "note {}: invalid tag '{tag}'",
                    self.id
                )));
            }
            if !seen.insert(tag.as_str()) {
                return Err(NotesError::validation(format!(
                    "note {}: duplicate tag '{tag}'",
                    self.id
                )));
            }
        }

        if self.updated_at < self.created_at {
            return Err(NotesError::validation(format!(
                "note {}: updatedAt precedes createdAt",
                self.id
            )));
        }

        Ok(())
    }

    /// Returns true if the note carries every one of `tags`.
    pub fn has_all_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|tag| self.tags.contains(tag))
    }

    /// Returns the subset of `tags` the note carries, in the order given.
    pub fn matching_tags(&self, tags: &[String]) -> Vec<String> {
        tags.iter()
            .filter(|tag| self.tags.contains(tag))
            .cloned()
            .collect()
    }
}

/// A note's metadata together with its full raw body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteContent {
    #[serde(flatten)]
    pub metadata: NoteMetadata,
    pub content: String,
}

impl NoteContent {
    pub fn new(metadata: NoteMetadata, content: impl Into<String>) -> Self {
        Self {
            metadata,
            content: content.into(),
        }
    }

    pub fn id(&self) -> NoteId {
        self.metadata.id
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn tags(&self) -> &[String] {
        &self.metadata.tags
    }

    pub fn summary(&self) -> Option<&str> {
        self.metadata.summary.as_deref()
    }
}

/// Builder for constructing `NoteMetadata` records.
///
/// # Examples
///
/// ```
/// use chappy_notes::{NoteId, NoteMetadataBuilder};
///
/// let meta = NoteMetadataBuilder::new(NoteId::generate(), "Async tips")
///     .tags(vec!["async".to_string()])
///     .build();
///
/// assert_eq!(meta.title, "Async tips");
/// assert_eq!(meta.created_at, meta.updated_at);
/// ```
#[derive(Debug)]
pub struct NoteMetadataBuilder {
    id: NoteId,
    title: String,
    tags: Vec<String>,
    source_conversation_id: Option<String>,
    content_path: Option<PathBuf>,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
    summary: Option<String>,
}

impl NoteMetadataBuilder {
    /// Starts a builder for the note with the given id and title.
    pub fn new(id: NoteId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            tags: Vec::new(),
            source_conversation_id: None,
            content_path: None,
            created_at: None,
            updated_at: None,
            summary: None,
        }
    }

    /// Sets the tags. They are stored as given; normalize them first.
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn source_conversation_id(mut self, id: Option<String>) -> Self {
        self.source_conversation_id = id;
        self
    }

    pub fn content_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_path = Some(path.into());
        self
    }

    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }

    /// Builds the record.
    ///
    /// Missing timestamps default to now (`updated_at` falls back to
    /// `created_at`); a missing content path defaults to `<id>.md`.
    pub fn build(self) -> NoteMetadata {
        let created_at = self.created_at.unwrap_or_else(OffsetDateTime::now_utc);
        let updated_at = self.updated_at.unwrap_or(created_at);
        let content_path = self
            .content_path
            .unwrap_or_else(|| PathBuf::from(format!("{}.md", self.id)));

        NoteMetadata {
            id: self.id,
            title: self.title,
            tags: self.tags,
            source_conversation_id: self.source_conversation_id,
            content_path,
            created_at,
            updated_at,
            summary: self.summary,
        }
    }
}

/// Returns true if `tag` is a normalized slug of acceptable length.
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.chars().count() <= TAG_MAX_LENGTH
        && TagNormalizer::normalize_tag(tag) == tag
}

pub(crate) fn validate_title(title: &str) -> Result<()> {
    let length = title.trim().chars().count();
    if length == 0 {
        return Err(NotesError::validation("title cannot be empty"));
    }
    if title.chars().count() > TITLE_MAX_LENGTH {
        return Err(NotesError::validation(format!(
            "title exceeds {TITLE_MAX_LENGTH} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_tag_count(count: usize) -> Result<()> {
    if count > TAG_MAX_COUNT {
        return Err(NotesError::validation(format!(
            "at most {TAG_MAX_COUNT} tags are allowed, got {count}"
        )));
    }
    Ok(())
}

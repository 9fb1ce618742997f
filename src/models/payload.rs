//! Outbound payload shapes handed to the presentation layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{NoteContent, NoteId};

/// One row of a list or search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePreview {
    pub id: NoteId,
    pub title: String,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub excerpt: String,
    #[serde(default)]
    pub matching_tags: Vec<String>,
    /// Relevance in `[0.15, 1.0]`; only present on search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
}

/// Filters that produced a preview list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewMeta {
    pub applied_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotePreviewPayload {
    pub notes: Vec<NotePreview>,
    /// Number of matches before pagination.
    pub total: usize,
    pub meta: PreviewMeta,
}

/// A stored note plus its rendered markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDetail {
    #[serde(flatten)]
    pub note: NoteContent,
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDetailPayload {
    pub note: NoteDetail,
}

/// Whether the editor is composing a new note or revising a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftMode {
    Create,
    Edit,
}

/// Editor contents. Stored-note fields are only present in edit mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NoteId>,
    pub title: String,
    pub tags: Vec<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<PathBuf>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSuggestions {
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEditorDraftPayload {
    pub mode: DraftMode,
    pub draft: NoteDraft,
    pub suggestions: DraftSuggestions,
}

/// Any payload, tagged by `"type"` the way the widget expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StructuredContent {
    NotePreview(NotePreviewPayload),
    NoteDetail(NoteDetailPayload),
    NoteEditorDraft(NoteEditorDraftPayload),
}

impl From<NotePreviewPayload> for StructuredContent {
    fn from(payload: NotePreviewPayload) -> Self {
        Self::NotePreview(payload)
    }
}

impl From<NoteDetailPayload> for StructuredContent {
    fn from(payload: NoteDetailPayload) -> Self {
        Self::NoteDetail(payload)
    }
}

impl From<NoteEditorDraftPayload> for StructuredContent {
    fn from(payload: NoteEditorDraftPayload) -> Self {
        Self::NoteEditorDraft(payload)
    }
}

/// Serializes a lone [`NotePreviewPayload`] with the same `"type"` tag it
/// carries inside [`StructuredContent`].
///
/// Use with `#[serde(serialize_with = "tagged_preview::serialize")]`.
pub mod tagged_preview {
    use serde::{Serialize, Serializer};

    use super::NotePreviewPayload;

    #[derive(Serialize)]
    #[serde(tag = "type", rename_all = "camelCase")]
    enum Tagged<'a> {
        NotePreview(&'a NotePreviewPayload),
    }

    pub fn serialize<S: Serializer>(
        payload: &NotePreviewPayload,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        Tagged::NotePreview(payload).serialize(serializer)
    }

    pub mod option {
        use serde::{Serialize, Serializer};

        use super::{NotePreviewPayload, Tagged};

        pub fn serialize<S: Serializer>(
            payload: &Option<NotePreviewPayload>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            payload.as_ref().map(Tagged::NotePreview).serialize(serializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREVIEW_FIXTURE: &str = r#"{
        "type": "notePreview",
        "notes": [{
            "id": "11111111-2222-4333-8444-555555555555",
            "title": "Async Patterns in JS",
            "tags": ["javascript", "async"],
            "createdAt": "2025-11-01T10:00:00.000Z",
            "updatedAt": "2025-11-08T12:00:00.000Z",
            "excerpt": "Async JavaScript can be managed with promises and async/await.",
            "matchScore": 0.92,
            "matchingTags": ["async"]
        }],
        "total": 1,
        "meta": { "appliedTags": ["async"], "query": "async" }
    }"#;

    #[test]
    fn preview_fixture_parses_as_tagged_content() {
        let parsed: StructuredContent = serde_json::from_str(PREVIEW_FIXTURE).unwrap();
        let StructuredContent::NotePreview(payload) = parsed else {
            panic!("expected a preview payload");
        };

        assert_eq!(payload.total, 1);
        assert_eq!(payload.meta.query.as_deref(), Some("async"));
        assert!((payload.notes[0].match_score.unwrap() - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn standalone_preview_snapshot_carries_type() {
        #[derive(Serialize)]
        struct Wrapper {
            #[serde(serialize_with = "tagged_preview::serialize")]
            snapshot: NotePreviewPayload,
        }

        let wrapper = Wrapper {
            snapshot: NotePreviewPayload {
                notes: Vec::new(),
                total: 0,
                meta: PreviewMeta::default(),
            },
        };
        let json = serde_json::to_value(&wrapper).unwrap();

        assert_eq!(json["snapshot"]["type"], "notePreview");
        assert_eq!(json["snapshot"]["total"], 0);
        let back: StructuredContent = serde_json::from_value(json["snapshot"].clone()).unwrap();
        assert!(matches!(back, StructuredContent::NotePreview(_)));
    }

    #[test]
    fn editor_draft_serializes_type_and_mode() {
        let payload = NoteEditorDraftPayload {
            mode: DraftMode::Create,
            draft: NoteDraft {
                id: None,
                title: "New Note".to_string(),
                tags: vec!["learning".to_string()],
                content: "Draft body".to_string(),
                summary: Some("Short summary".to_string()),
                source_conversation_id: None,
                content_path: None,
                created_at: None,
                updated_at: None,
            },
            suggestions: DraftSuggestions {
                tags: vec!["learning".to_string(), "notes".to_string()],
                title: Some("New Note".to_string()),
            },
        };

        let json = serde_json::to_value(StructuredContent::from(payload)).unwrap();
        assert_eq!(json["type"], "noteEditorDraft");
        assert_eq!(json["mode"], "create");
        assert!(json["draft"].get("id").is_none());
        assert!(json["draft"].get("createdAt").is_none());
    }

    #[test]
    fn edit_mode_draft_parses_stored_fields() {
        let json = r#"{
            "type": "noteEditorDraft",
            "mode": "edit",
            "draft": {
                "id": "22222222-3333-4444-8555-666666666666",
                "title": "Async Patterns in JS",
                "tags": ["javascript", "async"],
                "contentPath": "data/notes/async-patterns.md",
                "createdAt": "2025-10-21T09:30:00.000Z",
                "updatedAt": "2025-11-08T12:15:00.000Z",
                "content": "Promise.all / Race / AllSettled",
                "sourceConversationId": "conv-async-01"
            },
            "suggestions": { "tags": ["javascript", "async", "patterns"] }
        }"#;

        let parsed: StructuredContent = serde_json::from_str(json).unwrap();
        let StructuredContent::NoteEditorDraft(payload) = parsed else {
            panic!("expected an editor draft payload");
        };
        assert_eq!(payload.mode, DraftMode::Edit);
        assert!(payload.draft.id.is_some());
        assert!(payload.draft.created_at.is_some());
        assert_eq!(payload.suggestions.title, None);
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::autotagger::{ContentTagSource, TagNormalizer, TagSuggester};
use crate::error::Result;
use crate::markdown::NoteMarkdown;
use crate::models::{
    ConversationContext, ConversationTurn, DraftMode, DraftSuggestions, NoteContent, NoteDetail,
    NoteDetailPayload, NoteDraft, NoteEditorDraftPayload, NoteId, NoteMetadata, NotePreview,
    NotePreviewPayload, PreviewMeta, TITLE_MAX_LENGTH, tagged_preview,
};
use crate::search::{self, create_excerpt, match_score, rank_by_score, truncate_with_ellipsis};
use crate::store::{CreateNoteInput, FileNoteStore, SearchQuery, UpdateNoteInput};

/// Page size of `list_notes` when none is requested.
pub const DEFAULT_LIST_LIMIT: usize = 20;
/// Largest page size accepted by list and search.
pub const MAX_LIST_LIMIT: usize = 50;
/// Page size of `search_notes` when none is requested.
pub const DEFAULT_SEARCH_LIMIT: usize = 8;
/// Longest summary a generated draft carries, in characters.
pub const SUMMARY_MAX_LENGTH: usize = 200;

const DRAFT_TITLE_FALLBACK: &str = "New note";
const EMPTY_CONVERSATION: &str = "(empty conversation)";
const SENTENCE_ENDS: [char; 6] = ['.', '!', '?', '！', '？', '。'];

/// Options for [`NotesService::list_notes`].
///
/// # Examples
///
/// ```
/// use chappy_notes::service::ListNotesOptions;
///
/// let options = ListNotesOptions {
///     limit: Some(5),
///     tags: Some(vec!["rust".to_string()]),
///     ..Default::default()
/// };
/// assert_eq!(options.offset, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListNotesOptions {
    /// Page size, clamped to `1..=MAX_LIST_LIMIT`. Defaults to `DEFAULT_LIST_LIMIT`.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    /// Only notes carrying all of these tags (after normalization) are listed.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Options for [`NotesService::search_notes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchNotesOptions {
    /// Page size, clamped to `1..=MAX_LIST_LIMIT`. Defaults to `DEFAULT_SEARCH_LIMIT`.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub query: Option<String>,
}

/// Inputs of [`NotesService::generate_draft`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerateDraftOptions {
    pub conversation_context: ConversationContext,
    #[serde(default)]
    pub tag_hints: Option<Vec<String>>,
    #[serde(default)]
    pub title_hint: Option<String>,
    #[serde(default)]
    pub summary_hint: Option<String>,
    #[serde(default)]
    pub source_conversation_id: Option<String>,
}

/// A page of previews plus the pagination actually applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub payload: NotePreviewPayload,
    pub limit: usize,
    pub offset: usize,
    /// Matches before pagination.
    pub total: usize,
    pub applied_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// A written note plus a fresh first page of the default list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailResult {
    pub payload: NoteDetailPayload,
    #[serde(serialize_with = "tagged_preview::serialize")]
    pub list_snapshot: NotePreviewPayload,
}

/// Orchestrates the store, the tag suggester and the ranking functions.
///
/// NotesService owns a `FileNoteStore` and turns its records into the payloads
/// the presentation layer renders: paginated previews, note details and editor
/// drafts. It holds no state of its own beyond the store.
///
/// # Examples
///
/// ```no_run
/// use chappy_notes::service::{ListNotesOptions, NotesService};
/// use chappy_notes::store::{CreateNoteInput, FileNoteStore};
///
/// # fn main() -> chappy_notes::Result<()> {
/// let service = NotesService::new(FileNoteStore::open("data/notes")?);
///
/// let created = service.create_note(CreateNoteInput::new("Rust ownership", "Borrowing rules"))?;
/// assert!(!created.payload.note.note.tags().is_empty(), "tags are inferred");
///
/// let page = service.list_notes(&ListNotesOptions::default())?;
/// assert_eq!(page.payload.notes[0].id, created.payload.note.note.id());
/// # Ok(())
/// # }
/// ```
pub struct NotesService {
    store: FileNoteStore,
    tagger: TagSuggester,
}

impl NotesService {
    pub fn new(store: FileNoteStore) -> Self {
        Self {
            store,
            tagger: TagSuggester::new(),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &FileNoteStore {
        &self.store
    }

    /// Lists notes, most recently updated first, filtered by tags and paginated.
    ///
    /// `total` counts every note passing the tag filter, not just the page.
    /// An offset past the end yields an empty page.
    pub fn list_notes(&self, options: &ListNotesOptions) -> Result<ListResult> {
        let limit = clamp_limit(options.limit, DEFAULT_LIST_LIMIT);
        let offset = options.offset.unwrap_or(0);
        let applied_tags = normalize_request_tags(options.tags.as_deref());

        let filtered = search::filter_by_tags(self.store.list_notes()?, &applied_tags);
        let total = filtered.len();

        let mut previews = Vec::new();
        for metadata in filtered.into_iter().skip(offset).take(limit) {
            let note = self.load(metadata)?;
            let excerpt = create_excerpt(Some(excerpt_source(&note)), None);
            let matching_tags = note.metadata.matching_tags(&applied_tags);
            previews.push(preview(note, excerpt, matching_tags, None));
        }

        log::debug!(
            "listed {} of {total} notes (offset {offset}, limit {limit})",
            previews.len()
        );

        Ok(ListResult {
            payload: NotePreviewPayload {
                notes: previews,
                total,
                meta: PreviewMeta {
                    applied_tags: applied_tags.clone(),
                    query: None,
                },
            },
            limit,
            offset,
            total,
            applied_tags,
            query: None,
        })
    }

    /// Searches notes and orders them by relevance.
    ///
    /// The store narrows candidates by tags and substring; every candidate is
    /// then scored, sorted by descending score (ties keep store order) and
    /// paginated. A blank query performs a tag-only search.
    pub fn search_notes(&self, options: &SearchNotesOptions) -> Result<ListResult> {
        let limit = clamp_limit(options.limit, DEFAULT_SEARCH_LIMIT);
        let offset = options.offset.unwrap_or(0);
        let applied_tags = normalize_request_tags(options.tags.as_deref());
        let query = options
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let matches = self.store.search_notes(&SearchQuery {
            query: query.clone(),
            tags: applied_tags.clone(),
        })?;

        let needle = query.as_deref().unwrap_or_default();
        let mut scored = Vec::with_capacity(matches.len());
        for metadata in matches {
            let note = self.load(metadata)?;
            let matching_tags = note.metadata.matching_tags(&applied_tags);
            let excerpt = create_excerpt(Some(excerpt_source(&note)), query.as_deref());
            let score = match_score(needle, &note, matching_tags.len());
            scored.push(preview(note, excerpt, matching_tags, Some(score)));
        }
        rank_by_score(&mut scored);

        let total = scored.len();
        let page: Vec<NotePreview> = scored.into_iter().skip(offset).take(limit).collect();

        log::debug!(
            "search {:?} matched {total} notes, returning {}",
            query.as_deref().unwrap_or_default(),
            page.len()
        );

        Ok(ListResult {
            payload: NotePreviewPayload {
                notes: page,
                total,
                meta: PreviewMeta {
                    applied_tags: applied_tags.clone(),
                    query: query.clone(),
                },
            },
            limit,
            offset,
            total,
            applied_tags,
            query,
        })
    }

    /// Returns the detail payload of one note, or `None` if the id is unknown.
    pub fn get_note(&self, id: NoteId) -> Result<Option<NoteDetailPayload>> {
        Ok(self.store.get_note(id)?.map(detail_payload))
    }

    /// Creates a note and returns it with a fresh default list snapshot.
    ///
    /// Supplied tags are normalized and used as-is. When none survive
    /// normalization, tags are inferred from the title, summary and body.
    ///
    /// # Errors
    ///
    /// `NotesError::Validation` if the title is empty or too long.
    pub fn create_note(&self, mut input: CreateNoteInput) -> Result<DetailResult> {
        let mut tags = normalize_request_tags(input.tags.as_deref());
        if tags.is_empty() {
            tags = self.tagger.suggest_from_content(&ContentTagSource {
                title: Some(input.title.as_str()),
                content: Some(input.content.as_str()),
                summary: input.summary.as_deref(),
                hints: &[],
            });
            log::debug!("inferred tags {tags:?} for new note");
        }
        input.tags = Some(tags);

        let note = self.store.create_note(input)?;
        Ok(DetailResult {
            payload: detail_payload(note),
            list_snapshot: self.default_snapshot()?,
        })
    }

    /// Updates a note and returns it with a fresh default list snapshot.
    ///
    /// Returns `Ok(None)` if no note has the given id. Supplied tags replace
    /// the stored ones even if empty; omitted fields are kept.
    pub fn update_note(&self, input: UpdateNoteInput) -> Result<Option<DetailResult>> {
        let Some(note) = self.store.update_note(input)? else {
            return Ok(None);
        };
        Ok(Some(DetailResult {
            payload: detail_payload(note),
            list_snapshot: self.default_snapshot()?,
        }))
    }

    /// Builds an editor draft from a conversation without touching the store.
    ///
    /// - Title: the title hint, else the topic, else the first user turn up to
    ///   its first sentence end, else `"New note"`; cut to 180 characters.
    /// - Summary: the summary hint, else every turn as `Label: text` joined by
    ///   spaces; cut to 200 characters. No turns and no hint means no summary.
    /// - Content: one `### Role` section per turn.
    /// - Tags: hints first, then suggestions from the topic and turns.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chappy_notes::service::{GenerateDraftOptions, NotesService};
    /// use chappy_notes::store::FileNoteStore;
    /// use chappy_notes::{ConversationContext, ConversationTurn};
    ///
    /// # fn main() -> chappy_notes::Result<()> {
    /// let service = NotesService::new(FileNoteStore::open("data/notes")?);
    /// let draft = service.generate_draft(&GenerateDraftOptions {
    ///     conversation_context: ConversationContext::new(vec![
    ///         ConversationTurn::user("How do lifetimes work? I keep hitting E0597."),
    ///     ]),
    ///     ..Default::default()
    /// });
    ///
    /// assert_eq!(draft.draft.title, "How do lifetimes work");
    /// # Ok(())
    /// # }
    /// ```
    pub fn generate_draft(&self, options: &GenerateDraftOptions) -> NoteEditorDraftPayload {
        let context = &options.conversation_context;
        let hints = normalize_request_tags(options.tag_hints.as_deref());
        let tags = self.tagger.suggest_from_conversation(context, &hints);

        let title = resolve_title(options.title_hint.as_deref(), context);
        let summary = resolve_summary(options.summary_hint.as_deref(), &context.turns);
        let content = format_conversation(&context.turns);
        let source_conversation_id = options
            .source_conversation_id
            .clone()
            .unwrap_or_else(|| format!("conv-{}", Uuid::new_v4()));

        NoteEditorDraftPayload {
            mode: DraftMode::Create,
            draft: NoteDraft {
                id: None,
                title: title.clone(),
                tags: tags.clone(),
                content,
                summary,
                source_conversation_id: Some(source_conversation_id),
                content_path: None,
                created_at: None,
                updated_at: None,
            },
            suggestions: DraftSuggestions {
                tags,
                title: Some(title),
            },
        }
    }

    /// Opens a stored note in the editor. Returns `None` if the id is unknown.
    ///
    /// Suggested tags start with the note's current tags, followed by tags
    /// inferred from its content.
    pub fn edit_draft(&self, id: NoteId) -> Result<Option<NoteEditorDraftPayload>> {
        let Some(note) = self.store.get_note(id)? else {
            return Ok(None);
        };

        let suggested = self.tagger.suggest_from_content(&ContentTagSource {
            title: Some(note.title()),
            content: Some(note.content.as_str()),
            summary: note.summary(),
            hints: note.tags(),
        });

        let metadata = note.metadata;
        Ok(Some(NoteEditorDraftPayload {
            mode: DraftMode::Edit,
            suggestions: DraftSuggestions {
                tags: suggested,
                title: Some(metadata.title.clone()),
            },
            draft: NoteDraft {
                id: Some(metadata.id),
                title: metadata.title,
                tags: metadata.tags,
                content: note.content,
                summary: metadata.summary,
                source_conversation_id: metadata.source_conversation_id,
                content_path: Some(metadata.content_path),
                created_at: Some(metadata.created_at),
                updated_at: Some(metadata.updated_at),
            },
        }))
    }

    fn default_snapshot(&self) -> Result<NotePreviewPayload> {
        let options = ListNotesOptions {
            limit: Some(DEFAULT_LIST_LIMIT),
            offset: Some(0),
            tags: None,
        };
        Ok(self.list_notes(&options)?.payload)
    }

    fn load(&self, metadata: NoteMetadata) -> Result<NoteContent> {
        let content = self.store.read_content(&metadata)?;
        Ok(NoteContent::new(metadata, content))
    }
}

fn clamp_limit(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
}

fn normalize_request_tags(tags: Option<&[String]>) -> Vec<String> {
    TagNormalizer::normalize_tags(tags.unwrap_or_default())
}

/// Summary if it has text, otherwise the body.
fn excerpt_source(note: &NoteContent) -> &str {
    note.summary()
        .filter(|summary| !summary.trim().is_empty())
        .unwrap_or(note.content.as_str())
}

fn preview(
    note: NoteContent,
    excerpt: String,
    matching_tags: Vec<String>,
    match_score: Option<f64>,
) -> NotePreview {
    let metadata = note.metadata;
    NotePreview {
        id: metadata.id,
        title: metadata.title,
        tags: metadata.tags,
        created_at: metadata.created_at,
        updated_at: metadata.updated_at,
        excerpt,
        matching_tags,
        match_score,
    }
}

fn detail_payload(note: NoteContent) -> NoteDetailPayload {
    let markdown = NoteMarkdown::for_note(&note).render();
    NoteDetailPayload {
        note: NoteDetail { note, markdown },
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn resolve_title(hint: Option<&str>, context: &ConversationContext) -> String {
    let first_sentence = context
        .first_user_message()
        .and_then(|message| message.split(SENTENCE_ENDS).next());

    let source = non_blank(hint)
        .or_else(|| non_blank(context.topic.as_deref()))
        .or_else(|| non_blank(first_sentence))
        .unwrap_or(DRAFT_TITLE_FALLBACK);

    truncate_with_ellipsis(source, TITLE_MAX_LENGTH)
}

fn resolve_summary(hint: Option<&str>, turns: &[ConversationTurn]) -> Option<String> {
    if let Some(hint) = non_blank(hint) {
        return Some(truncate_with_ellipsis(hint, SUMMARY_MAX_LENGTH));
    }
    if turns.is_empty() {
        return None;
    }

    let combined = turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.summary_label(), turn.content))
        .collect::<Vec<_>>()
        .join(" ");
    Some(truncate_with_ellipsis(&combined, SUMMARY_MAX_LENGTH))
}

fn format_conversation(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return EMPTY_CONVERSATION.to_string();
    }
    turns
        .iter()
        .map(|turn| format!("### {}\n{}", turn.role.section_label(), turn.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

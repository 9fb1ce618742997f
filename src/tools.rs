//! Remote-callable tool surface.
//!
//! A tool call is a name plus a JSON argument object. [`ToolRequest::parse`]
//! decodes and validates the arguments; [`execute`] runs the request against a
//! [`NotesService`] and wraps the result in a [`ToolResponse`]. Invalid input
//! is rejected here, before anything reaches the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NotesError, Result};
use crate::models::{
    NoteId, NotePreviewPayload, StructuredContent, TAG_MAX_COUNT, TITLE_MAX_LENGTH,
    tagged_preview, validate_tag_count, validate_title,
};
use crate::service::{
    GenerateDraftOptions, ListNotesOptions, ListResult, MAX_LIST_LIMIT, NotesService,
    SearchNotesOptions,
};
use crate::store::{CreateNoteInput, UpdateNoteInput};

pub const TOOL_PING: &str = "notes.ping";
pub const TOOL_LIST: &str = "notes.list";
pub const TOOL_SEARCH: &str = "notes.search";
pub const TOOL_GET: &str = "notes.get";
pub const TOOL_CREATE: &str = "notes.create";
pub const TOOL_UPDATE: &str = "notes.update";
pub const TOOL_GENERATE_DRAFT: &str = "notes.generateDraft";
pub const TOOL_EDIT_DRAFT: &str = "notes.editDraft";

/// Every tool name, in registration order.
pub const TOOL_NAMES: [&str; 8] = [
    TOOL_PING,
    TOOL_LIST,
    TOOL_SEARCH,
    TOOL_GET,
    TOOL_CREATE,
    TOOL_UPDATE,
    TOOL_GENERATE_DRAFT,
    TOOL_EDIT_DRAFT,
];

/// Longest accepted search query, in characters.
pub const QUERY_MAX_LENGTH: usize = 500;
/// Longest accepted summary on create, in characters.
pub const SUMMARY_INPUT_MAX_LENGTH: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdArgs {
    id: NoteId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

/// A decoded, validated tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    Ping,
    List(ListNotesOptions),
    Search(SearchNotesOptions),
    Get(NoteId),
    Create(CreateNoteInput),
    Update(UpdateNoteInput),
    GenerateDraft(GenerateDraftOptions),
    EditDraft(NoteId),
}

impl ToolRequest {
    /// Decodes the arguments of tool `name` and checks them against its contract.
    ///
    /// A `null` argument value is read as an empty object.
    ///
    /// # Errors
    ///
    /// `NotesError::Validation` for an unknown tool, a malformed or unknown
    /// field, or a value outside its allowed range.
    ///
    /// # Examples
    ///
    /// ```
    /// use chappy_notes::tools::ToolRequest;
    /// use serde_json::json;
    ///
    /// let request = ToolRequest::parse("notes.list", json!({ "limit": 5 })).unwrap();
    /// assert!(matches!(request, ToolRequest::List(_)));
    ///
    /// let err = ToolRequest::parse("notes.list", json!({ "limit": 0 })).unwrap_err();
    /// assert!(err.is_validation());
    /// ```
    pub fn parse(name: &str, arguments: Value) -> Result<Self> {
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let request = match name {
            TOOL_PING => {
                decode::<NoArgs>(name, arguments)?;
                Self::Ping
            }
            TOOL_LIST => {
                let options: ListNotesOptions = decode(name, arguments)?;
                check_listing(options.limit, options.tags.as_deref(), None)?;
                Self::List(options)
            }
            TOOL_SEARCH => {
                let options: SearchNotesOptions = decode(name, arguments)?;
                check_listing(
                    options.limit,
                    options.tags.as_deref(),
                    options.query.as_deref(),
                )?;
                Self::Search(options)
            }
            TOOL_GET => Self::Get(decode::<IdArgs>(name, arguments)?.id),
            TOOL_CREATE => {
                let input: CreateNoteInput = decode(name, arguments)?;
                check_create(&input)?;
                Self::Create(input)
            }
            TOOL_UPDATE => {
                let input: UpdateNoteInput = decode(name, arguments)?;
                check_update(&input)?;
                Self::Update(input)
            }
            TOOL_GENERATE_DRAFT => {
                let options: GenerateDraftOptions = decode(name, arguments)?;
                check_draft(&options)?;
                Self::GenerateDraft(options)
            }
            TOOL_EDIT_DRAFT => Self::EditDraft(decode::<IdArgs>(name, arguments)?.id),
            unknown => {
                return Err(NotesError::validation(format!("unknown tool '{unknown}'")));
            }
        };

        Ok(request)
    }

    /// The tool name this request was parsed from.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => TOOL_PING,
            Self::List(_) => TOOL_LIST,
            Self::Search(_) => TOOL_SEARCH,
            Self::Get(_) => TOOL_GET,
            Self::Create(_) => TOOL_CREATE,
            Self::Update(_) => TOOL_UPDATE,
            Self::GenerateDraft(_) => TOOL_GENERATE_DRAFT,
            Self::EditDraft(_) => TOOL_EDIT_DRAFT,
        }
    }
}

/// What a tool call hands back to the caller.
///
/// Writes also carry `listSnapshot`, the refreshed first page of the default
/// list, so the widget can update without another round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<StructuredContent>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "tagged_preview::option::serialize"
    )]
    pub list_snapshot: Option<NotePreviewPayload>,
}

impl ToolResponse {
    fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            structured_content: None,
            list_snapshot: None,
        }
    }

    fn with_content(message: impl Into<String>, content: impl Into<StructuredContent>) -> Self {
        Self {
            structured_content: Some(content.into()),
            ..Self::text(message)
        }
    }

    fn not_found(id: NoteId) -> Self {
        Self::text(format!("Note {id} not found"))
    }
}

/// Runs `request` against `service`.
///
/// A missing note is not an error: the response says so and carries no payload.
pub fn execute(service: &NotesService, request: ToolRequest) -> Result<ToolResponse> {
    log::debug!("executing {}", request.name());

    let response = match request {
        ToolRequest::Ping => ToolResponse::text("pong"),
        ToolRequest::List(options) => {
            let result = service.list_notes(&options)?;
            let message = page_message("Listed", &result);
            ToolResponse::with_content(message, result.payload)
        }
        ToolRequest::Search(options) => {
            let result = service.search_notes(&options)?;
            let message = match result.query.as_deref() {
                Some(query) => format!("{} for \"{query}\"", page_message("Found", &result)),
                None => page_message("Found", &result),
            };
            ToolResponse::with_content(message, result.payload)
        }
        ToolRequest::Get(id) => match service.get_note(id)? {
            Some(payload) => {
                let message = format!("Loaded note \"{}\"", payload.note.note.title());
                ToolResponse::with_content(message, payload)
            }
            None => ToolResponse::not_found(id),
        },
        ToolRequest::Create(input) => {
            let result = service.create_note(input)?;
            let message = format!("Created note \"{}\"", result.payload.note.note.title());
            ToolResponse {
                list_snapshot: Some(result.list_snapshot),
                ..ToolResponse::with_content(message, result.payload)
            }
        }
        ToolRequest::Update(input) => {
            let id = input.id;
            match service.update_note(input)? {
                Some(result) => {
                    let message = format!("Updated note \"{}\"", result.payload.note.note.title());
                    ToolResponse {
                        list_snapshot: Some(result.list_snapshot),
                        ..ToolResponse::with_content(message, result.payload)
                    }
                }
                None => ToolResponse::not_found(id),
            }
        }
        ToolRequest::GenerateDraft(options) => {
            let payload = service.generate_draft(&options);
            let message = format!("Drafted note \"{}\"", payload.draft.title);
            ToolResponse::with_content(message, payload)
        }
        ToolRequest::EditDraft(id) => match service.edit_draft(id)? {
            Some(payload) => {
                let message = format!("Opened note \"{}\" for editing", payload.draft.title);
                ToolResponse::with_content(message, payload)
            }
            None => ToolResponse::not_found(id),
        },
    };

    Ok(response)
}

/// Parses and executes one call.
pub fn call(service: &NotesService, name: &str, arguments: Value) -> Result<ToolResponse> {
    execute(service, ToolRequest::parse(name, arguments)?)
}

fn decode<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| NotesError::validation(format!("{tool}: {e}")))
}

fn page_message(verb: &str, result: &ListResult) -> String {
    let shown = result.payload.notes.len();
    let noun = if result.total == 1 { "note" } else { "notes" };
    format!("{verb} {shown} of {} {noun}", result.total)
}

fn check_listing(limit: Option<usize>, tags: Option<&[String]>, query: Option<&str>) -> Result<()> {
    if let Some(limit) = limit
        && !(1..=MAX_LIST_LIMIT).contains(&limit)
    {
        return Err(NotesError::validation(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}, got {limit}"
        )));
    }
    validate_tag_count(tags.map_or(0, <[String]>::len))?;
    check_length("query", query, QUERY_MAX_LENGTH)
}

fn check_create(input: &CreateNoteInput) -> Result<()> {
    validate_title(&input.title)?;
    validate_tag_count(input.tags.as_ref().map_or(0, Vec::len))?;
    check_length("summary", input.summary.as_deref(), SUMMARY_INPUT_MAX_LENGTH)
}

fn check_update(input: &UpdateNoteInput) -> Result<()> {
    if let Some(title) = input.title.as_deref() {
        validate_title(title)?;
    }
    validate_tag_count(input.tags.as_ref().map_or(0, Vec::len))
}

fn check_draft(options: &GenerateDraftOptions) -> Result<()> {
    if let Some(index) = options
        .conversation_context
        .turns
        .iter()
        .position(|turn| turn.content.trim().is_empty())
    {
        return Err(NotesError::validation(format!(
            "conversation turn {index} has no content"
        )));
    }

    let hints = options.tag_hints.as_ref().map_or(0, Vec::len);
    if hints > TAG_MAX_COUNT {
        return Err(NotesError::validation(format!(
            "at most {TAG_MAX_COUNT} tag hints are allowed, got {hints}"
        )));
    }
    check_length("titleHint", options.title_hint.as_deref(), TITLE_MAX_LENGTH)
}

fn check_length(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(value) if value.chars().count() > max => Err(NotesError::validation(format!(
            "{field} exceeds {max} characters"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileNoteStore;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn service() -> (TempDir, NotesService) {
        let dir = tempdir().unwrap();
        let store = FileNoteStore::open(dir.path()).unwrap();
        (dir, NotesService::new(store))
    }

    fn rejects(name: &str, arguments: Value) {
        let err = ToolRequest::parse(name, arguments).unwrap_err();
        assert!(err.is_validation(), "{name} should reject: {err}");
    }

    #[test]
    fn parses_every_known_tool() {
        let id = NoteId::generate().to_string();
        let calls = [
            (TOOL_PING, json!(null)),
            (TOOL_LIST, json!({})),
            (TOOL_SEARCH, json!({ "query": "async", "tags": ["js"] })),
            (TOOL_GET, json!({ "id": id })),
            (TOOL_CREATE, json!({ "title": "T", "content": "C" })),
            (TOOL_UPDATE, json!({ "id": id, "title": "New" })),
            (
                TOOL_GENERATE_DRAFT,
                json!({ "conversationContext": { "turns": [{ "role": "user", "content": "hi" }] } }),
            ),
            (TOOL_EDIT_DRAFT, json!({ "id": id })),
        ];

        for (name, arguments) in calls {
            let request = ToolRequest::parse(name, arguments).unwrap();
            assert_eq!(request.name(), name);
        }
    }

    #[test]
    fn rejects_unknown_tools_and_fields() {
        rejects("notes.delete", json!({}));
        rejects(TOOL_LIST, json!({ "page": 2 }));
        rejects(TOOL_CREATE, json!({ "title": "T", "content": "C", "color": "red" }));
    }

    #[test]
    fn rejects_out_of_range_listing_arguments() {
        rejects(TOOL_LIST, json!({ "limit": 0 }));
        rejects(TOOL_LIST, json!({ "limit": 51 }));
        rejects(TOOL_LIST, json!({ "offset": -1 }));
        let eleven: Vec<String> = (0..11).map(|i| format!("t{i}")).collect();
        rejects(TOOL_SEARCH, json!({ "tags": eleven }));
        rejects(TOOL_SEARCH, json!({ "query": "q".repeat(501) }));
        assert!(ToolRequest::parse(TOOL_SEARCH, json!({ "limit": 50, "query": "q".repeat(500) })).is_ok());
    }

    #[test]
    fn rejects_invalid_create_and_update_arguments() {
        rejects(TOOL_CREATE, json!({ "title": "   ", "content": "C" }));
        rejects(TOOL_CREATE, json!({ "title": "t".repeat(181), "content": "C" }));
        rejects(TOOL_CREATE, json!({ "title": "T" }));
        rejects(TOOL_CREATE, json!({ "title": "T", "content": "C", "summary": "s".repeat(1001) }));
        rejects(TOOL_UPDATE, json!({ "id": "not-a-uuid" }));
        rejects(TOOL_UPDATE, json!({ "id": NoteId::generate(), "title": "" }));
    }

    #[test]
    fn rejects_invalid_draft_arguments() {
        rejects(
            TOOL_GENERATE_DRAFT,
            json!({ "conversationContext": { "turns": [{ "role": "user", "content": "  " }] } }),
        );
        rejects(
            TOOL_GENERATE_DRAFT,
            json!({ "conversationContext": { "turns": [{ "role": "tool", "content": "x" }] } }),
        );
        rejects(
            TOOL_GENERATE_DRAFT,
            json!({ "conversationContext": { "turns": [] }, "titleHint": "t".repeat(181) }),
        );
        rejects(TOOL_GENERATE_DRAFT, json!({}));
    }

    #[test]
    fn create_then_list_through_tools() {
        let (_dir, service) = service();

        let created = call(
            &service,
            TOOL_CREATE,
            json!({ "title": "Async JavaScript", "content": "Promises", "tags": ["JS"] }),
        )
        .unwrap();
        assert_eq!(created.message, "Created note \"Async JavaScript\"");
        assert_eq!(created.list_snapshot.as_ref().unwrap().total, 1);

        let listed = call(&service, TOOL_LIST, json!({ "tags": ["js"] })).unwrap();
        let json = serde_json::to_value(&listed).unwrap();
        assert_eq!(json["message"], "Listed 1 of 1 note");
        assert_eq!(json["structuredContent"]["type"], "notePreview");
        assert_eq!(json["structuredContent"]["notes"][0]["title"], "Async JavaScript");
        assert!(json.get("listSnapshot").is_none());
    }

    #[test]
    fn missing_notes_report_not_found() {
        let (_dir, service) = service();
        let id = NoteId::generate();

        for name in [TOOL_GET, TOOL_UPDATE, TOOL_EDIT_DRAFT] {
            let response = call(&service, name, json!({ "id": id })).unwrap();
            assert_eq!(response.message, format!("Note {id} not found"));
            assert!(response.structured_content.is_none());
        }
    }

    #[test]
    fn search_message_mentions_query() {
        let (_dir, service) = service();
        call(&service, TOOL_CREATE, json!({ "title": "Rust", "content": "ownership" })).unwrap();

        let response = call(&service, TOOL_SEARCH, json!({ "query": "owner" })).unwrap();

        assert_eq!(response.message, "Found 1 of 1 note for \"owner\"");
        let Some(StructuredContent::NotePreview(payload)) = response.structured_content else {
            panic!("expected preview payload");
        };
        assert!(payload.notes[0].match_score.is_some());
    }

    #[test]
    fn draft_tool_returns_editor_payload() {
        let (_dir, service) = service();

        let response = call(
            &service,
            TOOL_GENERATE_DRAFT,
            json!({
                "conversationContext": {
                    "topic": "Weekly retro",
                    "turns": [{ "role": "user", "content": "Summarize the retro #retro" }]
                },
                "tagHints": ["Team"]
            }),
        )
        .unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["structuredContent"]["type"], "noteEditorDraft");
        assert_eq!(json["structuredContent"]["mode"], "create");
        assert_eq!(json["structuredContent"]["draft"]["title"], "Weekly retro");
        assert_eq!(json["structuredContent"]["draft"]["tags"][0], "team");
    }

    #[test]
    fn ping_answers_pong() {
        let (_dir, service) = service();
        assert_eq!(call(&service, TOOL_PING, json!({})).unwrap().message, "pong");
    }
}

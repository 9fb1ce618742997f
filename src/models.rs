mod conversation;
mod ids;
mod note;
mod payload;

pub use conversation::{ConversationContext, ConversationTurn, Role};
pub use ids::NoteId;
pub use note::{
    NoteContent, NoteMetadata, NoteMetadataBuilder, TAG_MAX_COUNT, TAG_MAX_LENGTH,
    TITLE_MAX_LENGTH, is_valid_tag,
};
pub(crate) use note::{validate_tag_count, validate_title};
pub use payload::{
    DraftMode, DraftSuggestions, NoteDetail, NoteDetailPayload, NoteDraft,
    NoteEditorDraftPayload, NotePreview, NotePreviewPayload, PreviewMeta, StructuredContent,
    tagged_preview,
};

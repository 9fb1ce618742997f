//! Note storage, tag inference and ranked retrieval behind a small tool surface.
//!
//! The crate is layered bottom-up:
//!
//! - [`autotagger`] normalizes tags and suggests them from free text.
//! - [`store`] persists notes as flat files plus a JSON index.
//! - [`search`] filters, scores and excerpts notes.
//! - [`service`] composes the three into list/search/create/update/draft operations.
//! - [`tools`] decodes and validates remote tool calls and dispatches them.

pub mod autotagger;
pub mod config;
pub mod error;
pub mod markdown;
pub mod models;
pub mod search;
pub mod service;
pub mod store;
pub mod tools;

pub use error::{NotesError, Result};
pub use models::{
    ConversationContext, ConversationTurn, DraftMode, NoteContent, NoteDetailPayload, NoteDraft,
    NoteEditorDraftPayload, NoteId, NoteMetadata, NoteMetadataBuilder, NotePreview,
    NotePreviewPayload, Role, StructuredContent,
};
pub use service::NotesService;
pub use store::FileNoteStore;

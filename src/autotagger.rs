//! Tag normalization and tag inference from unstructured text.
//!
//! Two components live here:
//!
//! - [`TagNormalizer`] turns free text into slugs (`" Data Science! "` becomes
//!   `"data-science"`). Every tag that reaches the store goes through it.
//! - [`TagSuggester`] scores candidate tags from titles, bodies and conversation
//!   turns. The notes service calls it when a note is created without tags and
//!   when an editor draft is generated.
//!
//! # Examples
//!
//! ```
//! use chappy_notes::autotagger::{TagNormalizer, TagSuggester};
//! use chappy_notes::{ConversationContext, ConversationTurn};
//!
//! let hints = TagNormalizer::normalize_tags(["Weekly Notes", "Team"]);
//! let conversation = ConversationContext::new(vec![
//!     ConversationTurn::user("Summarize the retro #retro"),
//! ])
//! .with_topic("Weekly retro");
//!
//! let tags = TagSuggester::new().suggest_from_conversation(&conversation, &hints);
//! assert_eq!(&tags[..2], ["weekly-notes", "team"]);
//! assert!(tags.contains(&"retro".to_string()));
//! ```

mod normalizer;
mod suggester;

pub use normalizer::TagNormalizer;
pub use suggester::{ContentTagSource, TagSuggester};

//! Deterministic markdown rendering for note artifacts and detail payloads.

use std::sync::LazyLock;

use regex::Regex;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::autotagger::TagNormalizer;
use crate::models::NoteContent;

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("blank-run pattern is valid"));

/// Provenance shown on the metadata line under the title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownMetadata {
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
    pub source_conversation_id: Option<String>,
    pub source: Option<String>,
}

/// An extra `##` section appended after the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownSection {
    pub heading: String,
    pub content: String,
}

/// A diagram stored under `figures/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramReference {
    pub file_name: String,
    pub caption: Option<String>,
}

/// Builder for a note's markdown document.
///
/// Blocks are emitted in a fixed order: title, metadata line, tags line,
/// blockquoted summary, body, extra sections, diagram images. Runs of blank
/// lines are collapsed to one.
///
/// # Examples
///
/// ```
/// use chappy_notes::markdown::NoteMarkdown;
///
/// let markdown = NoteMarkdown::new("Sample")
///     .tags(["Web Dev", "React"])
///     .body("Main body")
///     .summary("Quick summary")
///     .section("Details", "More details")
///     .diagram("diagram.svg", Some("Architecture"))
///     .render();
///
/// assert!(markdown.starts_with("# Sample\n"));
/// assert!(markdown.contains("Tags: #web-dev #react"));
/// assert!(markdown.contains("> Quick summary"));
/// assert!(markdown.contains("## Details"));
/// assert!(markdown.contains("![Architecture](figures/diagram.svg)"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct NoteMarkdown {
    title: String,
    body: String,
    tags: Vec<String>,
    summary: Option<String>,
    sections: Vec<MarkdownSection>,
    diagrams: Vec<DiagramReference>,
    metadata: MarkdownMetadata,
}

impl NoteMarkdown {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Builds the document for a stored note.
    pub fn for_note(note: &NoteContent) -> Self {
        let meta = &note.metadata;
        Self::new(meta.title.as_str())
            .body(note.content.as_str())
            .tags(&meta.tags)
            .summary_opt(meta.summary.clone())
            .metadata(MarkdownMetadata {
                created_at: Some(meta.created_at),
                updated_at: Some(meta.updated_at),
                source_conversation_id: meta.source_conversation_id.clone(),
                source: None,
            })
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the tags; they are normalized when rendered.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags.into_iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    pub fn summary(self, summary: impl Into<String>) -> Self {
        self.summary_opt(Some(summary.into()))
    }

    pub fn summary_opt(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }

    pub fn section(mut self, heading: impl Into<String>, content: impl Into<String>) -> Self {
        self.sections.push(MarkdownSection {
            heading: heading.into(),
            content: content.into(),
        });
        self
    }

    pub fn diagram(mut self, file_name: impl Into<String>, caption: Option<&str>) -> Self {
        self.diagrams.push(DiagramReference {
            file_name: file_name.into(),
            caption: caption.map(str::to_string),
        });
        self
    }

    pub fn metadata(mut self, metadata: MarkdownMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Renders the document. Always ends with a single newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut blocks = vec![format!("# {}", self.title.trim())];

        if let Some(line) = self.metadata_line() {
            blocks.push(line);
        }

        let tags = TagNormalizer::normalize_tags(&self.tags);
        if !tags.is_empty() {
            let hashed: Vec<String> = tags.iter().map(|t| format!("#{t}")).collect();
            blocks.push(format!("Tags: {}", hashed.join(" ")));
        }

        if let Some(summary) = self.summary.as_deref().map(str::trim)
            && !summary.is_empty()
        {
            let quoted: Vec<String> = summary
                .lines()
                .map(|line| format!("> {line}").trim_end().to_string())
                .collect();
            blocks.push(quoted.join("\n"));
        }

        let body = self.body.trim();
        if !body.is_empty() {
            blocks.push(body.to_string());
        }

        for section in &self.sections {
            blocks.push(format!(
                "## {}\n\n{}",
                section.heading.trim(),
                section.content.trim()
            ));
        }

        for diagram in &self.diagrams {
            let caption = diagram.caption.as_deref().unwrap_or(&diagram.file_name);
            blocks.push(format!("![{caption}](figures/{})", diagram.file_name));
        }

        let joined = blocks.join("\n\n").replace("\r\n", "\n");
        let collapsed = BLANK_RUNS.replace_all(&joined, "\n\n");
        format!("{}\n", collapsed.trim_end())
    }

    fn metadata_line(&self) -> Option<String> {
        let meta = &self.metadata;
        let mut parts = Vec::new();

        if let Some(created) = meta.created_at.and_then(|t| t.format(&Rfc3339).ok()) {
            parts.push(format!("Created: {created}"));
        }
        if let Some(updated) = meta.updated_at.and_then(|t| t.format(&Rfc3339).ok()) {
            parts.push(format!("Updated: {updated}"));
        }
        if let Some(conversation) = meta.source_conversation_id.as_deref() {
            parts.push(format!("Conversation: {conversation}"));
        }
        if let Some(source) = meta.source.as_deref() {
            parts.push(format!("Source: {source}"));
        }

        (!parts.is_empty()).then(|| parts.join(" | "))
    }
}

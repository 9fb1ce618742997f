//! Tag filtering, substring matching, relevance scoring and excerpts.
//!
//! The store uses [`filter_by_tags`] and [`full_text_search`] to narrow the
//! candidate set; the service scores the survivors with [`match_score`], orders
//! them with [`rank_by_score`] and builds previews with [`create_excerpt`].

use crate::error::Result;
use crate::models::{NoteContent, NoteMetadata, NotePreview};

/// Width of an excerpt window, in characters.
pub const EXCERPT_LENGTH: usize = 140;
/// Excerpt shown for notes with no text at all.
pub const EMPTY_EXCERPT: &str = "(no content)";
/// Marker appended or prepended when text was clipped.
pub const ELLIPSIS: char = '…';

const TITLE_WEIGHT: f64 = 0.4;
const SUMMARY_WEIGHT: f64 = 0.2;
const BODY_WEIGHT: f64 = 0.3;
const TAG_WEIGHT: f64 = 0.05;
const TAG_BONUS_CAP: f64 = 0.1;
const MIN_MATCH_SCORE: f64 = 0.15;
const TAG_ONLY_BASE: f64 = 0.3;
const TAG_ONLY_STEP: f64 = 0.1;

/// Keeps the notes that carry every tag in `tags`. An empty filter keeps all.
pub fn filter_by_tags(notes: Vec<NoteMetadata>, tags: &[String]) -> Vec<NoteMetadata> {
    if tags.is_empty() {
        return notes;
    }
    notes.into_iter().filter(|note| note.has_all_tags(tags)).collect()
}

/// Keeps the notes whose title, summary or body contains `query`, ignoring case.
///
/// Title and summary are checked first; `read_content` is only called for
/// notes that miss on both. Input order is preserved.
///
/// # Errors
///
/// Propagates the first error returned by `read_content`.
pub fn full_text_search<F>(
    notes: Vec<NoteMetadata>,
    query: &str,
    mut read_content: F,
) -> Result<Vec<NoteMetadata>>
where
    F: FnMut(&NoteMetadata) -> Result<String>,
{
    let needle = query.to_lowercase();
    let mut results = Vec::new();

    for note in notes {
        let metadata_hit = contains_lowercase(&note.title, &needle)
            || note
                .summary
                .as_deref()
                .is_some_and(|summary| contains_lowercase(summary, &needle));

        if metadata_hit || contains_lowercase(&read_content(&note)?, &needle) {
            results.push(note);
        }
    }

    Ok(results)
}

/// Relevance of `note` for `query`, in `[0.15, 1.0]`.
///
/// With an empty query only tag matches count: `min(1, 0.3 + 0.1 * matches)`.
/// Otherwise title, summary and body hits add 0.4, 0.2 and 0.3 and each
/// matching tag adds 0.05, up to 0.1.
///
/// # Examples
///
/// ```
/// use chappy_notes::search::match_score;
/// use chappy_notes::{NoteContent, NoteId, NoteMetadataBuilder};
///
/// let meta = NoteMetadataBuilder::new(NoteId::generate(), "Async JavaScript").build();
/// let note = NoteContent::new(meta, "Callback queue details");
///
/// assert!((match_score("async", &note, 0) - 0.4).abs() < 1e-9);
/// assert!((match_score("", &note, 2) - 0.5).abs() < 1e-9);
/// ```
pub fn match_score(query: &str, note: &NoteContent, matching_tags: usize) -> f64 {
    let tag_count = matching_tags as f64;

    if query.is_empty() {
        return (TAG_ONLY_BASE + TAG_ONLY_STEP * tag_count).min(1.0);
    }

    let needle = query.to_lowercase();
    let mut score = 0.0;
    if contains_lowercase(note.title(), &needle) {
        score += TITLE_WEIGHT;
    }
    if note
        .summary()
        .is_some_and(|summary| contains_lowercase(summary, &needle))
    {
        score += SUMMARY_WEIGHT;
    }
    if contains_lowercase(&note.content, &needle) {
        score += BODY_WEIGHT;
    }
    if matching_tags > 0 {
        score += (TAG_WEIGHT * tag_count).min(TAG_BONUS_CAP);
    }

    score.clamp(MIN_MATCH_SCORE, 1.0)
}

/// Sorts previews by descending `match_score`. Equal scores keep their order.
pub fn rank_by_score(previews: &mut [NotePreview]) {
    previews.sort_by(|a, b| {
        let a = a.match_score.unwrap_or(0.0);
        let b = b.match_score.unwrap_or(0.0);
        b.total_cmp(&a)
    });
}

/// Builds a preview excerpt from `text`.
///
/// Whitespace runs collapse to single spaces. If `query` occurs in the text
/// (ignoring case) the excerpt is a window of `EXCERPT_LENGTH` characters
/// starting half a window before the match, with `…` marking clipped ends.
/// Otherwise the text is cut to `EXCERPT_LENGTH` characters.
///
/// # Examples
///
/// ```
/// use chappy_notes::search::create_excerpt;
///
/// assert_eq!(create_excerpt(Some("  short\n\ttext "), None), "short text");
/// assert_eq!(create_excerpt(None, Some("x")), "(no content)");
/// ```
pub fn create_excerpt(text: Option<&str>, query: Option<&str>) -> String {
    let cleaned = text
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.is_empty() {
        return EMPTY_EXCERPT.to_string();
    }

    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return truncate_with_ellipsis(&cleaned, EXCERPT_LENGTH);
    };

    let chars: Vec<char> = cleaned.chars().collect();
    let Some(index) = find_ignore_case(&chars, query) else {
        return truncate_with_ellipsis(&cleaned, EXCERPT_LENGTH);
    };

    let start = index.saturating_sub(EXCERPT_LENGTH / 2);
    let end = (start + EXCERPT_LENGTH).min(chars.len());

    let mut excerpt = String::new();
    if start > 0 {
        excerpt.push(ELLIPSIS);
    }
    excerpt.extend(&chars[start..end]);
    if start + EXCERPT_LENGTH < chars.len() {
        excerpt.push(ELLIPSIS);
    }
    excerpt
}

/// Cuts `text` to at most `max` characters, the last being `…` if anything was dropped.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push(ELLIPSIS);
    cut
}

fn contains_lowercase(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

/// Character index of the first case-insensitive occurrence of `needle`.
fn find_ignore_case(haystack: &[char], needle: &str) -> Option<usize> {
    let fold = |c: char| c.to_lowercase().next().unwrap_or(c);
    let needle: Vec<char> = needle.chars().map(fold).collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    haystack.windows(needle.len()).position(|window| {
        window
            .iter()
            .zip(&needle)
            .all(|(&h, &n)| fold(h) == n)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotesError;
    use crate::models::{NoteId, NoteMetadataBuilder};
    use time::OffsetDateTime;

    fn meta(title: &str, tags: &[&str], summary: Option<&str>) -> NoteMetadata {
        NoteMetadataBuilder::new(NoteId::generate(), title)
            .tags(tags.iter().map(|t| t.to_string()).collect())
            .summary(summary.map(str::to_string))
            .build()
    }

    fn sample_notes() -> Vec<NoteMetadata> {
        vec![
            meta(
                "Async JavaScript",
                &["javascript", "async"],
                Some("Promises and async/await overview"),
            ),
            meta("React patterns", &["react"], Some("Hooks and Suspense")),
        ]
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn preview(title: &str, score: Option<f64>) -> NotePreview {
        let now = OffsetDateTime::now_utc();
        NotePreview {
            id: NoteId::generate(),
            title: title.to_string(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            excerpt: String::new(),
            matching_tags: Vec::new(),
            match_score: score,
        }
    }

    #[test]
    fn filters_by_every_requested_tag() {
        let filtered = filter_by_tags(sample_notes(), &tags(&["javascript", "async"]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Async JavaScript");
    }

    #[test]
    fn empty_tag_filter_keeps_everything() {
        assert_eq!(filter_by_tags(sample_notes(), &[]).len(), 2);
    }

    #[test]
    fn full_text_search_reads_body_only_when_metadata_misses() {
        let notes = sample_notes();
        let first = notes[0].id;
        let mut reads = Vec::new();

        let results = full_text_search(notes, "hooks", |note| {
            reads.push(note.id);
            Ok(if note.id == first {
                "Callback queue details".to_string()
            } else {
                "Hooks deep dive".to_string()
            })
        })
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "React patterns");
        assert_eq!(reads, vec![first], "summary hit skips the body read");
    }

    #[test]
    fn full_text_search_matches_body_case_insensitively() {
        let results = full_text_search(sample_notes(), "QUEUE", |_| {
            Ok("callback queue details".to_string())
        })
        .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn full_text_search_propagates_read_errors() {
        let result = full_text_search(sample_notes(), "zzz", |_| {
            Err(NotesError::validation("unreadable"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn title_hit_scores_at_least_point_four() {
        let note = NoteContent::new(meta("Async JavaScript", &[], None), "nothing here");
        let score = match_score("async", &note, 0);
        assert!((score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn every_hit_plus_tags_caps_at_one() {
        let note = NoteContent::new(
            meta("Rust async", &[], Some("async runtimes")),
            "tokio is an async runtime",
        );
        assert!((match_score("async", &note, 5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tag_bonus_is_capped_at_point_one() {
        let note = NoteContent::new(meta("Body only", &[], None), "needle");
        assert!((match_score("needle", &note, 1) - 0.35).abs() < 1e-9);
        assert!((match_score("needle", &note, 4) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn weak_matches_are_floored() {
        let note = NoteContent::new(meta("Unrelated", &[], None), "nothing");
        assert!((match_score("absent", &note, 0) - MIN_MATCH_SCORE).abs() < 1e-9);
    }

    #[test]
    fn tag_only_search_scores_by_matching_tags() {
        let note = NoteContent::new(meta("Any", &[], None), "");
        assert!((match_score("", &note, 0) - 0.3).abs() < 1e-9);
        assert!((match_score("", &note, 3) - 0.6).abs() < 1e-9);
        assert!((match_score("", &note, 9) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let mut previews = vec![
            preview("low", Some(0.15)),
            preview("tie-a", Some(0.4)),
            preview("high", Some(0.9)),
            preview("tie-b", Some(0.4)),
        ];
        rank_by_score(&mut previews);
        let titles: Vec<&str> = previews.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "tie-a", "tie-b", "low"]);
    }

    #[test]
    fn excerpt_placeholder_for_blank_text() {
        assert_eq!(create_excerpt(Some(" \n\t "), None), EMPTY_EXCERPT);
    }

    #[test]
    fn excerpt_truncates_long_text_without_query() {
        let text = "a".repeat(200);
        let excerpt = create_excerpt(Some(&text), None);
        assert_eq!(excerpt.chars().count(), EXCERPT_LENGTH);
        assert!(excerpt.ends_with(ELLIPSIS));
    }

    #[test]
    fn excerpt_centers_window_on_match() {
        let text = format!("{}NEEDLE{}", "x".repeat(100), "y".repeat(100));
        let excerpt = create_excerpt(Some(&text), Some("needle"));

        assert!(excerpt.starts_with(ELLIPSIS));
        assert!(excerpt.ends_with(ELLIPSIS));
        assert!(excerpt.contains("NEEDLE"));
        assert_eq!(excerpt.chars().count(), EXCERPT_LENGTH + 2);
    }

    #[test]
    fn excerpt_window_clamps_at_text_start() {
        let text = format!("needle {}", "z".repeat(10));
        assert_eq!(create_excerpt(Some(&text), Some("NEEDLE")), text);
    }

    #[test]
    fn excerpt_without_match_falls_back_to_prefix() {
        assert_eq!(
            create_excerpt(Some("plain text"), Some("missing")),
            "plain text"
        );
    }

    #[test]
    fn excerpt_windows_count_characters_not_bytes() {
        let text = format!("{}検索{}", "あ".repeat(90), "い".repeat(90));
        let excerpt = create_excerpt(Some(&text), Some("検索"));
        assert!(excerpt.contains("検索"));
        assert_eq!(excerpt.chars().filter(|c| *c == 'あ').count(), 70);
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("abcdef", 4), "abc…");
    }
}

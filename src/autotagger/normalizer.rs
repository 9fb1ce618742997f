use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{TAG_MAX_COUNT, TAG_MAX_LENGTH};

/// Everything outside the letter and number classes the suggester matches on.
static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s-]").expect("slug pattern is valid"));

/// Canonicalizes free-text tags into lowercase slugs.
///
/// A slug is one or more runs of Unicode letters or numbers joined by single
/// hyphens, so `"Data Science!"`, `"data   science"` and `"--DATA-science--"`
/// all become `"data-science"`.
pub struct TagNormalizer;

impl TagNormalizer {
    /// Normalizes a single tag.
    ///
    /// # Normalization rules
    ///
    /// - Trims and lowercases
    /// - Removes every character outside `\p{L}`, `\p{N}`, whitespace and hyphen
    ///   (combining marks included)
    /// - Turns each whitespace run into one hyphen
    /// - Collapses repeated hyphens and strips leading/trailing ones
    ///
    /// Returns an empty string when nothing survives; callers discard those.
    ///
    /// # Examples
    ///
    /// ```
    /// use chappy_notes::autotagger::TagNormalizer;
    ///
    /// assert_eq!(TagNormalizer::normalize_tag(" Data Science! "), "data-science");
    /// assert_eq!(TagNormalizer::normalize_tag("C++"), "c");
    /// assert_eq!(TagNormalizer::normalize_tag("週次 ふりかえり"), "週次-ふりかえり");
    /// assert_eq!(TagNormalizer::normalize_tag("!!!"), "");
    /// ```
    #[must_use]
    pub fn normalize_tag(tag: &str) -> String {
        let lowered = tag.trim().to_lowercase();
        let kept = NON_SLUG_CHARS
            .replace_all(&lowered, "")
            .chars()
            .map(|c| if c.is_whitespace() { '-' } else { c })
            .collect::<String>();

        kept.split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Normalizes a list of tags into a note's tag set.
    ///
    /// Each entry is normalized and cut to `TAG_MAX_LENGTH` characters; empty
    /// results and repeats are dropped (first occurrence wins) and the list is
    /// capped at `TAG_MAX_COUNT` entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use chappy_notes::autotagger::TagNormalizer;
    ///
    /// let tags = TagNormalizer::normalize_tags(["Test", "HELLO", "test", "  "]);
    /// assert_eq!(tags, vec!["test", "hello"]);
    /// ```
    #[must_use]
    pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        tags.into_iter()
            .map(|tag| Self::truncate(&Self::normalize_tag(tag.as_ref())))
            .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
            .take(TAG_MAX_COUNT)
            .collect()
    }

    /// Cuts a normalized tag to the maximum length without leaving a dangling hyphen.
    pub(crate) fn truncate(tag: &str) -> String {
        if tag.chars().count() <= TAG_MAX_LENGTH {
            return tag.to_string();
        }
        tag.chars()
            .take(TAG_MAX_LENGTH)
            .collect::<String>()
            .trim_end_matches('-')
            .to_string()
    }
}

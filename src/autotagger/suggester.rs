//! Frequency-based tag suggestions for notes and conversations.
//!
//! Text is split into ordered blocks (topic or title first). Every word of two
//! or more letters/numbers scores the positional weight of its block, earlier
//! blocks weighing more; explicit `#hashtags` score a flat bonus. Candidates are
//! ranked by score, ties broken alphabetically, and placed after any caller
//! supplied hints.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::normalizer::TagNormalizer;
use crate::models::{ConversationContext, TAG_MAX_COUNT};

/// Score awarded to each hashtag occurrence.
const HASHTAG_WEIGHT: u32 = 4;

/// Words never proposed as tags.
const STOP_WORDS: &[&str] = &[
    "the", "and", "with", "from", "that", "this", "have", "has", "into", "your", "about", "http",
    "https", "www", "note", "notes", "memo", "chatgpt", "please", "make", "prepare",
];

static HASHTAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[#＃]([\p{L}\p{N}ー]{1,32})").expect("hashtag pattern is valid")
});

static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}ー]{2,}").expect("word pattern is valid"));

/// Note fields used to derive tags when a note is saved without any.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTagSource<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub hints: &'a [String],
}

/// Suggests up to `TAG_MAX_COUNT` tags from unstructured text.
///
/// # Examples
///
/// ```
/// use chappy_notes::autotagger::{ContentTagSource, TagSuggester};
///
/// let tags = TagSuggester::new().suggest_from_content(&ContentTagSource {
///     title: Some("Understanding GraphQL Clients"),
///     content: Some("Compare Apollo Client with URQL and caching patterns."),
///     ..Default::default()
/// });
///
/// assert!(tags.contains(&"graphql".to_string()));
/// assert!(tags.contains(&"apollo".to_string()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TagSuggester;

impl TagSuggester {
    pub fn new() -> Self {
        Self
    }

    /// Suggests tags for a conversation: the topic first, then each turn in order.
    ///
    /// `hints` are normalized and always lead the result in the order given.
    #[must_use]
    pub fn suggest_from_conversation(
        &self,
        conversation: &ConversationContext,
        hints: &[String],
    ) -> Vec<String> {
        let blocks = std::iter::once(conversation.topic.as_deref().unwrap_or_default())
            .chain(conversation.turns.iter().map(|turn| turn.content.as_str()));
        self.generate(blocks, hints)
    }

    /// Suggests tags for a note from its title, summary and body, in that order of weight.
    #[must_use]
    pub fn suggest_from_content(&self, source: &ContentTagSource<'_>) -> Vec<String> {
        let blocks = [
            source.title.unwrap_or_default(),
            source.summary.unwrap_or_default(),
            source.content.unwrap_or_default(),
        ];
        self.generate(blocks, source.hints)
    }

    fn generate<'a>(
        &self,
        blocks: impl IntoIterator<Item = &'a str>,
        hints: &[String],
    ) -> Vec<String> {
        let scores = score_blocks(blocks);

        let mut ranked: Vec<(String, u32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut combined = TagNormalizer::normalize_tags(hints);
        for (tag, _) in ranked {
            if combined.len() >= TAG_MAX_COUNT {
                break;
            }
            if !combined.contains(&tag) {
                combined.push(tag);
            }
        }
        combined
    }
}

/// Accumulates a score per normalized candidate across all blocks.
fn score_blocks<'a>(blocks: impl IntoIterator<Item = &'a str>) -> HashMap<String, u32> {
    let mut scores = HashMap::new();

    for (index, block) in blocks.into_iter().enumerate() {
        if block.is_empty() {
            continue;
        }

        for capture in HASHTAG_PATTERN.captures_iter(block) {
            push_candidate(&mut scores, &capture[1], HASHTAG_WEIGHT);
        }

        let weight = positional_weight(index);
        let lowered = block.to_lowercase();
        for word in WORD_PATTERN.find_iter(&lowered) {
            if STOP_WORDS.contains(&word.as_str()) {
                continue;
            }
            push_candidate(&mut scores, word.as_str(), weight);
        }
    }

    scores
}

fn push_candidate(scores: &mut HashMap<String, u32>, raw: &str, weight: u32) {
    let tag = TagNormalizer::truncate(&TagNormalizer::normalize_tag(raw));
    if tag.is_empty() {
        return;
    }
    *scores.entry(tag).or_insert(0) += weight;
}

/// 3 for the first block, 2 for the second, 1 for everything after.
fn positional_weight(index: usize) -> u32 {
    3u32.saturating_sub(u32::try_from(index).unwrap_or(u32::MAX)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationTurn;

    fn hints(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_tags_from_conversation_without_hints() {
        let conversation = ConversationContext::new(vec![
            ConversationTurn::user(
                "Please summarize React Suspense patterns and streaming rendering.",
            ),
            ConversationTurn::assistant(
                "Sure, I will cover Suspense, streaming, and fallback UI tips.",
            ),
        ])
        .with_topic("React Suspense overview");

        let tags = TagSuggester::new().suggest_from_conversation(&conversation, &[]);

        assert!(tags.contains(&"react".to_string()));
        assert!(tags.contains(&"suspense".to_string()));
        assert_eq!(tags[0], "suspense", "suspense scores highest: 3 + 2 + 1");
        assert!(!tags.contains(&"please".to_string()), "stop words are skipped");
    }

    #[test]
    fn hints_lead_in_input_order() {
        let conversation =
            ConversationContext::new(vec![ConversationTurn::user("Talk about caching please.")]);

        let tags = TagSuggester::new()
            .suggest_from_conversation(&conversation, &hints(&["HTTP", "Caching"]));

        assert_eq!(tags[0], "http");
        assert_eq!(tags[1], "caching");
        assert_eq!(
            tags.iter().filter(|t| *t == "caching").count(),
            1,
            "derived duplicates of hints are skipped"
        );
    }

    #[test]
    fn more_than_ten_hints_yield_exactly_ten() {
        let many: Vec<String> = (0..14).map(|i| format!("Hint {i}")).collect();
        let conversation =
            ConversationContext::new(vec![ConversationTurn::user("kubernetes operators")]);

        let tags = TagSuggester::new().suggest_from_conversation(&conversation, &many);

        assert_eq!(tags.len(), TAG_MAX_COUNT);
        let expected: Vec<String> = (0..10).map(|i| format!("hint-{i}")).collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn generates_tags_from_note_content() {
        let tags = TagSuggester::new().suggest_from_content(&ContentTagSource {
            title: Some("Understanding GraphQL Clients"),
            content: Some("Compare Apollo Client with URQL and caching patterns."),
            ..Default::default()
        });

        assert!(tags.contains(&"graphql".to_string()));
        assert!(tags.contains(&"apollo".to_string()));
        assert!(tags.len() <= TAG_MAX_COUNT);
    }

    #[test]
    fn extracts_japanese_words_and_full_width_hashtags() {
        let conversation = ConversationContext::new(vec![
            ConversationTurn::user("＃振り返り 今週の成果と課題をまとめてください。"),
            ConversationTurn::assistant("了解です。改善点と成功例を記録します。"),
        ])
        .with_topic("週次ふりかえり");

        let tags = TagSuggester::new().suggest_from_conversation(&conversation, &[]);

        assert!(tags.contains(&"週次ふりかえり".to_string()));
        assert!(tags.contains(&"振り返り".to_string()));
        assert_eq!(tags[0], "振り返り", "hashtag bonus outranks the topic");
    }

    #[test]
    fn ties_break_alphabetically() {
        let tags = TagSuggester::new().suggest_from_content(&ContentTagSource {
            content: Some("zeta alpha mid"),
            ..Default::default()
        });
        assert_eq!(tags, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn hashtags_outweigh_plain_words() {
        let tags = TagSuggester::new().suggest_from_content(&ContentTagSource {
            content: Some("design design #tokio"),
            ..Default::default()
        });
        // tokio: hashtag 4 + word 1 = 5, design: 1 + 1 = 2
        assert_eq!(tags, vec!["tokio", "design"]);
    }

    #[test]
    fn positional_weights_decay_to_one() {
        assert_eq!(positional_weight(0), 3);
        assert_eq!(positional_weight(1), 2);
        assert_eq!(positional_weight(2), 1);
        assert_eq!(positional_weight(9), 1);
    }

    #[test]
    fn empty_input_yields_only_hints() {
        let tags = TagSuggester::new().suggest_from_content(&ContentTagSource {
            hints: &hints(&["Team"]),
            ..Default::default()
        });
        assert_eq!(tags, vec!["team"]);
    }
}

//! Article drafts from completion output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompts::{build_messages, ChatMessage};

/// Drafting errors.
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Completion service error: {0}")]
    Completion(String),
}

pub type DraftResult<T> = Result<T, DraftError>;

/// What to write about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleRequest {
    pub topic: String,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A generated article, not yet stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub body: String,
}

/// Longest excerpt derived from the body when the completion omits one.
const EXCERPT_MAX_CHARS: usize = 200;

/// Text completion backend.
pub trait Completer: Send + Sync {
    /// Return the assistant's reply to a conversation.
    fn complete(&self, messages: &[ChatMessage]) -> DraftResult<String>;
}

/// Parse completion output into an article draft.
pub fn parse_article_output(output: &str) -> DraftResult<ArticleDraft> {
    // Completions often wrap the object in prose or code fences
    let json_start = output
        .find('{')
        .ok_or_else(|| DraftError::InvalidFormat("No JSON object found in response".into()))?;
    let json_end = output
        .rfind('}')
        .ok_or_else(|| DraftError::InvalidFormat("No closing brace found in response".into()))?;
    if json_end < json_start {
        return Err(DraftError::InvalidFormat("Closing brace precedes opening brace".into()));
    }

    let mut draft: ArticleDraft = serde_json::from_str(&output[json_start..=json_end])?;
    draft.title = draft.title.trim().to_string();
    draft.excerpt = draft.excerpt.trim().to_string();
    draft.body = draft.body.trim().to_string();

    if draft.title.is_empty() {
        return Err(DraftError::InvalidFormat("Draft has an empty title".into()));
    }
    if draft.body.is_empty() {
        return Err(DraftError::InvalidFormat("Draft has an empty body".into()));
    }
    if draft.excerpt.is_empty() {
        draft.excerpt = excerpt_from_body(&draft.body);
    }

    Ok(draft)
}

/// First paragraph of the body that is not a heading, cut to a word boundary.
fn excerpt_from_body(body: &str) -> String {
    let paragraph = body
        .split("\n\n")
        .flat_map(|p| p.lines())
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or("");

    if paragraph.chars().count() <= EXCERPT_MAX_CHARS {
        return paragraph.to_string();
    }

    let cut: String = paragraph.chars().take(EXCERPT_MAX_CHARS).collect();
    match cut.rfind(' ') {
        Some(space) => format!("{}...", &cut[..space]),
        None => format!("{}...", cut),
    }
}

/// URL slug: lowercase ASCII alphanumerics separated by single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Draft an article with a completion backend.
pub fn draft_article(completer: &dyn Completer, request: &ArticleRequest) -> DraftResult<ArticleDraft> {
    let messages = build_messages(
        &request.topic,
        request.audience.as_deref(),
        &request.keywords,
        true,
    );

    let output = completer.complete(&messages)?;
    tracing::debug!(topic = %request.topic, chars = output.len(), "Received completion");

    parse_article_output(&output)
}

/// Offline completer producing a fixed-shape article for the requested topic.
pub struct MockCompleter;

impl Completer for MockCompleter {
    fn complete(&self, messages: &[ChatMessage]) -> DraftResult<String> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .ok_or_else(|| DraftError::Completion("No user message to answer".into()))?;

        let topic = prompt
            .content
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("Write an article about: "))
            .unwrap_or("Your Health")
            .trim();

        let article = serde_json::json!({
            "title": title_case(topic),
            "excerpt": format!("What to know about {} between visits.", topic.to_lowercase()),
            "body": format!(
                "## Overview\n{} matters for your day-to-day health.\n\n## At home\nKeep taking your medication as prescribed and log your readings.\n\nQuestions? Contact your care team.",
                title_case(topic)
            ),
        });
        Ok(article.to_string())
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_with_surrounding_text() {
        let output = r###"Sure! Here is the article:
```json
{"title": " Sleep and Blood Pressure ", "excerpt": "Rest helps.", "body": "## Why\nIt matters."}
```
Let me know if you need changes."###;

        let draft = parse_article_output(output).unwrap();
        assert_eq!(draft.title, "Sleep and Blood Pressure");
        assert_eq!(draft.excerpt, "Rest helps.");
        assert!(draft.body.starts_with("## Why"));
    }

    #[test]
    fn test_parse_no_json() {
        let result = parse_article_output("I cannot help with that.");
        assert!(matches!(result, Err(DraftError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_malformed_json() {
        let result = parse_article_output(r#"{"title": "x", "body": }"#);
        assert!(matches!(result, Err(DraftError::JsonParse(_))));
    }

    #[test]
    fn test_parse_empty_body() {
        let result = parse_article_output(r#"{"title": "Hydration", "excerpt": "", "body": "  "}"#);
        assert!(matches!(result, Err(DraftError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_excerpt_derived_from_body() {
        let draft =
            parse_article_output(r###"{"title": "Hydration", "body": "## Water\nDrink through the day.\n\nMore."}"###)
                .unwrap();
        assert_eq!(draft.excerpt, "Drink through the day.");
    }

    #[test]
    fn test_long_excerpt_truncated() {
        let body = "word ".repeat(100);
        let excerpt = excerpt_from_body(&body);
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.chars().count() <= EXCERPT_MAX_CHARS + 3);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Managing Blood Pressure"), "managing-blood-pressure");
        assert_eq!(slugify("  COPD: 5 Tips -- for Winter!  "), "copd-5-tips-for-winter");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_mock_draft() {
        let request = ArticleRequest {
            topic: "heart failure and salt".into(),
            audience: Some("caregivers".into()),
            keywords: vec!["sodium".into()],
        };
        let draft = draft_article(&MockCompleter, &request).unwrap();
        assert_eq!(draft.title, "Heart Failure And Salt");
        assert!(draft.body.contains("care team"));
        assert_eq!(slugify(&draft.title), "heart-failure-and-salt");
    }

    struct FailingCompleter;

    impl Completer for FailingCompleter {
        fn complete(&self, _messages: &[ChatMessage]) -> DraftResult<String> {
            Err(DraftError::Completion("service unavailable".into()))
        }
    }

    #[test]
    fn test_completion_failure_propagates() {
        let request = ArticleRequest {
            topic: "asthma".into(),
            ..Default::default()
        };
        assert!(matches!(
            draft_article(&FailingCompleter, &request),
            Err(DraftError::Completion(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_slug_shape(title in ".{0,80}") {
            let slug = slugify(&title);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}

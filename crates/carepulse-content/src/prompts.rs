//! Prompts for drafting patient-education articles.

use serde::{Deserialize, Serialize};

/// System prompt for the health-education writer.
pub const SYSTEM_PROMPT: &str = r#"You are a health-education writer for a remote patient monitoring clinic.

Write clear, accurate articles for patients and caregivers:
- Plain language, short paragraphs, no jargon without explanation
- Practical advice a patient can act on at home
- Never give individual diagnoses or change a prescribed treatment
- End with a reminder to contact the care team with questions

Respond with a single JSON object with the keys "title", "excerpt" and "body".
The body is Markdown. The excerpt is one or two sentences."#;

/// A message in a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// User prompt for a single article.
pub fn make_article_prompt(topic: &str, audience: Option<&str>, keywords: &[String]) -> String {
    let mut prompt = format!("Write an article about: {}\n", topic.trim());

    if let Some(audience) = audience.map(str::trim).filter(|a| !a.is_empty()) {
        prompt.push_str(&format!("Audience: {}\n", audience));
    }

    let keywords: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if !keywords.is_empty() {
        prompt.push_str(&format!("Work in these keywords: {}\n", keywords.join(", ")));
    }

    prompt.push_str(r#"Return JSON: {"title": "...", "excerpt": "...", "body": "..."}"#);
    prompt
}

/// Example exchange that pins down the output shape.
pub const FEW_SHOT_EXAMPLE: (&str, &str) = (
    "Checking your blood pressure at home",
    r###"{"title":"Checking Your Blood Pressure at Home","excerpt":"A few habits make home readings accurate and useful for your care team.","body":"## Before you measure\nSit quietly for five minutes with your back supported.\n\n## Taking the reading\nRest your arm at heart level and keep the cuff on bare skin.\n\nQuestions? Contact your care team."}"###,
);

/// Full conversation for a chat-completion request.
pub fn build_messages(
    topic: &str,
    audience: Option<&str>,
    keywords: &[String],
    include_example: bool,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];

    if include_example {
        let (example_topic, example_output) = FEW_SHOT_EXAMPLE;
        messages.push(ChatMessage::user(make_article_prompt(example_topic, None, &[])));
        messages.push(ChatMessage::assistant(example_output));
    }

    messages.push(ChatMessage::user(make_article_prompt(topic, audience, keywords)));
    messages
}

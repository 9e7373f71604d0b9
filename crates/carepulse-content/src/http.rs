//! Chat-completion client over HTTP.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drafting::{Completer, DraftError, DraftResult};
use crate::prompts::ChatMessage;

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct HttpCompleter {
    url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::blocking::Client,
}

impl HttpCompleter {
    /// Create a client posting to `url` (the full completions endpoint).
    pub fn new(url: &str, api_key: Option<String>, model: &str, timeout_secs: u64) -> DraftResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DraftError::Completion(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for chat/completions
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

/// Response body from chat/completions
#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// First choice's message content.
fn first_choice(response: CompletionResponse) -> DraftResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| DraftError::InvalidFormat("Completion returned no choices".into()))
}

impl Completer for HttpCompleter {
    fn complete(&self, messages: &[ChatMessage]) -> DraftResult<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                DraftError::Completion("Request timed out".into())
            } else if e.is_connect() {
                DraftError::Completion(format!("Cannot reach completion service at {}", self.url))
            } else {
                DraftError::Completion(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Completion service returned an error");
            return Err(DraftError::Completion(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: CompletionResponse = response
            .json()
            .map_err(|e| DraftError::InvalidFormat(e.to_string()))?;

        first_choice(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = CompletionRequest {
            model: "gpt-test",
            messages: &messages,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-test");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "u");
    }

    #[test]
    fn test_first_choice() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"hello"}},
                {"index":1,"message":{"role":"assistant","content":"other"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice(response).unwrap(), "hello");
    }

    #[test]
    fn test_no_choices() {
        let response: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_choice(response), Err(DraftError::InvalidFormat(_))));
    }

    #[test]
    fn test_url_trailing_slash_trimmed() {
        let completer = HttpCompleter::new("http://localhost:9/v1/chat/completions/", None, "m", 5).unwrap();
        assert_eq!(completer.url, "http://localhost:9/v1/chat/completions");
        assert_eq!(completer.model(), "m");
    }
}

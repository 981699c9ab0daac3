//! OpenAI chat-completions provider.
//!
//! Speaks the `/v1/chat/completions` wire format, so any compatible gateway
//! works through the `api_url` config override.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::sanitize_api_error;
use super::traits::{ChatMessage, Provider};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: Option<&str>, api_key: &str) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Full completions URL; a base that already names the endpoint (custom
    /// gateways) is used verbatim.
    fn chat_completions_url(&self) -> String {
        if self.base_url.ends_with("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn transport(&self, source: reqwest::Error) -> Error {
        Error::Transport {
            provider: self.name().to_string(),
            source,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// First non-empty assistant text in the response, if any.
fn extract_text(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .map(|text| text.trim_end().to_string())
        .filter(|text| !text.is_empty())
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            temperature,
        };

        let response = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = sanitize_api_error(&body);
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(Error::AuthRejected {
                    provider: self.name().to_string(),
                    detail,
                });
            }
            return Err(Error::RemoteService {
                provider: self.name().to_string(),
                status,
                detail,
            });
        }

        let body = response.text().await.map_err(|e| self.transport(e))?;
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| Error::MalformedResponse {
                provider: self.name().to_string(),
                reason: e.to_string(),
            })?;

        extract_text(parsed).ok_or_else(|| Error::MalformedResponse {
            provider: self.name().to_string(),
            reason: "response contained no assistant text".into(),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_appends_endpoint() {
        let p = OpenAiProvider::new(None, "sk-test");
        assert_eq!(
            p.chat_completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn custom_base_url_strips_trailing_slash() {
        let p = OpenAiProvider::new(Some("http://localhost:11434/v1/"), "k");
        assert_eq!(
            p.chat_completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn full_endpoint_base_url_is_used_verbatim() {
        let p = OpenAiProvider::new(Some("https://gw.example.com/llm/chat/completions"), "k");
        assert_eq!(
            p.chat_completions_url(),
            "https://gw.example.com/llm/chat/completions"
        );
    }

    #[test]
    fn request_serializes_messages_in_order() {
        let messages = vec![
            ChatMessage::system("Be terse."),
            ChatMessage::user("hello"),
        ];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(json["temperature"], 0.2);
    }

    #[test]
    fn extracts_first_nonempty_choice() {
        let raw = r#"{"choices":[{"message":{"content":"Hello!"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(parsed).as_deref(), Some("Hello!"));
    }

    #[test]
    fn empty_choices_yield_no_text() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_text(parsed), None);
    }

    #[test]
    fn null_content_yields_no_text() {
        let raw = r#"{"choices":[{"message":{"content":null}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(parsed), None);
    }

    #[test]
    fn trailing_newline_is_trimmed() {
        let raw = "{\"choices\":[{\"message\":{\"content\":\"done\\n\"}}]}";
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(parsed).as_deref(), Some("done"));
    }
}

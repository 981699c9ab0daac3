//! The completion boundary: a message list in, assistant text out.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One message in an outbound completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

/// A chat-completion backend. The single external I/O boundary of a run:
/// on any failure the orchestrator persists nothing.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send the assembled messages and return the assistant's reply text.
    async fn chat(&self, messages: &[ChatMessage], model: &str, temperature: f64)
        -> Result<String>;

    /// The name of this provider implementation.
    fn name(&self) -> &str;
}

//! Session storage traits and types for persisted conversation state.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message in a conversation, tagged with its role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
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

/// Per-session configuration. All fields optional: an unset field falls back
/// to the loaded config, then to the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// A named, durable conversation: ordered history plus configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The record's key in the store; derived from the file name, not
    /// serialized into the record.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub config: SessionConfig,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Fresh session: empty history, default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            history: Vec::new(),
            config: SessionConfig::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record one completed exchange: exactly one user turn followed by one
    /// assistant turn.
    pub fn append_exchange(&mut self, user_text: &str, assistant_text: &str) {
        self.history.push(Turn::user(user_text));
        self.history.push(Turn::assistant(assistant_text));
        self.updated_at = Utc::now();
    }
}

/// Reduce a caller-supplied session name to a plain file name so it cannot
/// escape the state directory. Empty names are rejected.
pub fn sanitize_name(raw: &str) -> Result<String> {
    let name = std::path::Path::new(raw.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.is_empty() || name.starts_with('.') {
        return Err(Error::InvalidSessionName(raw.to_string()));
    }
    Ok(name.to_string())
}

/// Persistent storage for sessions and the last-used pointer.
///
/// The filesystem backend is the production implementation; an in-memory
/// backend backs the orchestrator tests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Deserialize the record under `name`, or produce an empty session if
    /// none exists. An unreadable record is a [`Error::CorruptState`], never
    /// a silent reset.
    async fn load_or_create(&self, name: &str) -> Result<Session>;

    /// Atomically replace the record for `session.name`. On failure the
    /// prior on-disk state remains intact.
    async fn save(&self, session: &Session) -> Result<()>;

    /// All saved session names, unordered. The pointer record is not a
    /// session and never appears here.
    async fn list(&self) -> Result<Vec<String>>;

    /// Remove a saved session. Clears the last-used pointer if it named it.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Rename a saved session. The last-used pointer follows the rename.
    async fn rename(&self, old: &str, new: &str) -> Result<()>;

    /// The session name last used successfully, if any.
    async fn last_used(&self) -> Result<Option<String>>;

    /// Record `name` as the last successfully used session. Called only
    /// after the session itself has been saved.
    async fn set_last_used(&self, name: &str) -> Result<()>;

    /// Forget the last-used pointer.
    async fn clear_last_used(&self) -> Result<()>;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}

/// Resolve the session name for this run: an explicit name verbatim
/// (sanitized), else the last-used pointer, else no session is available.
pub async fn resolve_name(store: &dyn SessionStore, explicit: Option<&str>) -> Result<String> {
    match explicit {
        Some(raw) => sanitize_name(raw),
        None => store
            .last_used()
            .await?
            .ok_or(Error::NoSessionAvailable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_empty_with_default_config() {
        let session = Session::new("research");
        assert_eq!(session.name, "research");
        assert!(session.history.is_empty());
        assert_eq!(session.config, SessionConfig::default());
    }

    #[test]
    fn append_exchange_adds_user_then_assistant() {
        let mut session = Session::new("s");
        session.append_exchange("hello", "hi there");
        assert_eq!(
            session.history,
            vec![Turn::user("hello"), Turn::assistant("hi there")]
        );
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_name("chat.gpt").unwrap(), "chat.gpt");
        assert_eq!(sanitize_name("  notes  ").unwrap(), "notes");
    }

    #[test]
    fn sanitize_rejects_empty_and_hidden_names() {
        assert!(matches!(
            sanitize_name(""),
            Err(Error::InvalidSessionName(_))
        ));
        assert!(matches!(
            sanitize_name("/"),
            Err(Error::InvalidSessionName(_))
        ));
        assert!(matches!(
            sanitize_name(".last_state"),
            Err(Error::InvalidSessionName(_))
        ));
    }

    #[test]
    fn record_with_unknown_fields_still_parses() {
        let raw = r#"{"history":[{"role":"user","content":"hi"}],"config":{},"future_field":42}"#;
        let session: Session = serde_json::from_str(raw).unwrap();
        assert_eq!(session.history.len(), 1);
    }
}

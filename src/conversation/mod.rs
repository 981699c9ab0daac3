//! Builds the outbound message list for one invocation: effective system
//! prompt, prior turns in order, then the new user turn.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::providers::ChatMessage;
use crate::sessions::Session;

/// Per-invocation configuration overrides from the command line. Each field
/// resolves override first, then the session's stored value, then the
/// built-in default from config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

impl Overrides {
    /// Fold these overrides into a session's stored configuration so future
    /// runs inherit them. Called only on the successful persistence path.
    pub fn apply_to(&self, session: &mut Session) {
        if let Some(system_prompt) = &self.system_prompt {
            session.config.system_prompt = Some(system_prompt.clone());
        }
        if let Some(model) = &self.model {
            session.config.model = Some(model.clone());
        }
        if let Some(temperature) = self.temperature {
            session.config.temperature = Some(temperature);
        }
    }
}

/// Effective system prompt: override, stored, or configured default.
pub fn effective_system_prompt(
    session: &Session,
    overrides: &Overrides,
    config: &Config,
) -> Option<String> {
    overrides
        .system_prompt
        .clone()
        .or_else(|| session.config.system_prompt.clone())
        .or_else(|| config.default_system_prompt.clone())
        .filter(|prompt| !prompt.trim().is_empty())
}

/// Effective model: override, stored, or configured default.
pub fn effective_model(session: &Session, overrides: &Overrides, config: &Config) -> String {
    overrides
        .model
        .clone()
        .or_else(|| session.config.model.clone())
        .unwrap_or_else(|| config.default_model.clone())
}

/// Effective temperature: override, stored, or configured default.
pub fn effective_temperature(session: &Session, overrides: &Overrides, config: &Config) -> f64 {
    overrides
        .temperature
        .or(session.config.temperature)
        .unwrap_or(config.default_temperature)
}

/// Compose the user text for this run from the inline prompt and piped
/// stdin. Inline text comes first; piped content is appended on its own
/// line when `append_stdin` is set, and stands alone when there is no
/// inline prompt.
pub fn compose_user_text(
    inline: Option<&str>,
    piped: Option<&str>,
    append_stdin: bool,
) -> Result<String> {
    let inline = inline.map(str::trim).filter(|text| !text.is_empty());
    let piped = piped.map(str::trim).filter(|text| !text.is_empty());

    match (inline, piped) {
        (Some(inline), Some(piped)) if append_stdin => Ok(format!("{inline}\n{piped}")),
        (Some(inline), _) => Ok(inline.to_string()),
        (None, Some(piped)) => Ok(piped.to_string()),
        (None, None) => Err(Error::EmptyPrompt),
    }
}

/// Assemble the full message list: system prompt (if any), prior history in
/// original order, then the new user turn.
pub fn assemble(
    session: &Session,
    user_text: &str,
    overrides: &Overrides,
    config: &Config,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(session.history.len() + 2);

    if let Some(system) = effective_system_prompt(session, overrides, config) {
        messages.push(ChatMessage::system(system));
    }

    for turn in &session.history {
        messages.push(ChatMessage {
            role: turn.role.clone(),
            content: turn.content.clone(),
        });
    }

    messages.push(ChatMessage::user(user_text));
    messages
}

//! Run orchestrator: one process invocation end to end.
//!
//! Resolve the session name, load or initialize state, assemble the request,
//! invoke the completion, then persist: append the exchange, save the
//! session, and only then write the last-used pointer. Every step
//! short-circuits on failure with nothing persisted; an ephemeral run skips
//! the store entirely.

use crate::config::Config;
use crate::conversation::{self, Overrides};
use crate::error::Result;
use crate::providers::Provider;
use crate::sessions::{resolve_name, Session, SessionStore};
use tracing::debug;

/// Inputs for one invocation, already parsed from the CLI.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Inline prompt text (`-p`).
    pub prompt: Option<String>,
    /// Piped stdin content, when stdin was not a terminal.
    pub piped: Option<String>,
    /// Append piped stdin to the inline prompt (`--stdin`).
    pub append_stdin: bool,
    /// Explicit session name (`-s`); absent means pointer resolution.
    pub session: Option<String>,
    /// Ephemeral run (`--new`): no state read or written.
    pub ephemeral: bool,
    pub overrides: Overrides,
}

/// Execute one invocation and return the assistant's reply.
pub async fn run(
    config: &Config,
    store: &dyn SessionStore,
    provider: &dyn Provider,
    request: RunRequest,
) -> Result<String> {
    let user_text = conversation::compose_user_text(
        request.prompt.as_deref(),
        request.piped.as_deref(),
        request.append_stdin,
    )?;

    if request.ephemeral {
        let transient = Session::new("ephemeral");
        let messages =
            conversation::assemble(&transient, &user_text, &request.overrides, config);
        let model = conversation::effective_model(&transient, &request.overrides, config);
        let temperature =
            conversation::effective_temperature(&transient, &request.overrides, config);
        debug!("ephemeral run with model {model}");
        return provider.chat(&messages, &model, temperature).await;
    }

    let name = resolve_name(store, request.session.as_deref()).await?;
    let mut session = store.load_or_create(&name).await?;

    let messages = conversation::assemble(&session, &user_text, &request.overrides, config);
    let model = conversation::effective_model(&session, &request.overrides, config);
    let temperature = conversation::effective_temperature(&session, &request.overrides, config);

    debug!(
        "invoking completion for session '{name}' ({} prior turns, model {model})",
        session.history.len()
    );
    let reply = provider.chat(&messages, &model, temperature).await?;

    // Persistence sequence: append, fold overrides, save, then pointer.
    // The pointer must never name a session that failed to save.
    session.append_exchange(&user_text, &reply);
    request.overrides.apply_to(&mut session);
    store.save(&session).await?;
    store.set_last_used(&name).await?;

    Ok(reply)
}

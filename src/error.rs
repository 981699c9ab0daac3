//! Failure taxonomy shared across the crate.
//!
//! Every failure aborts the current run; nothing is retried internally. The
//! binary maps each kind to a stable exit code via [`Error::exit_code`] so
//! shell callers can distinguish them (the mapping is documented in the
//! README).

use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Automatic session resolution was requested but no session has ever
    /// been used on this machine.
    #[error("no session specified and no previous session exists; use -s to name one or --new for an ephemeral run")]
    NoSessionAvailable,

    /// A session record exists on disk but cannot be deserialized. Never
    /// silently reset: the record may still be recoverable by hand.
    #[error("session '{name}' is unreadable: {reason}")]
    CorruptState { name: String, reason: String },

    /// Writing a session record or the last-used pointer failed. The prior
    /// on-disk state is left intact.
    #[error("could not persist state to {path}: {source}")]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither an inline prompt nor piped stdin produced any text.
    #[error("no prompt provided; use -p or pipe input via stdin")]
    EmptyPrompt,

    /// No API key in the environment. Checked before any session work.
    #[error("OPENAI_API_KEY is not set in the environment")]
    CredentialMissing,

    /// The remote service rejected our credential (401/403).
    #[error("{provider} rejected the API credential: {detail}")]
    AuthRejected { provider: String, detail: String },

    /// Could not reach the remote service: connect, timeout, or body I/O.
    #[error("transport failure talking to {provider}: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with a non-success status (quota, rate
    /// limit, server error). The body is sanitized before display.
    #[error("{provider} API error ({status}): {detail}")]
    RemoteService {
        provider: String,
        status: reqwest::StatusCode,
        detail: String,
    },

    /// A 2xx response that did not contain extractable assistant text.
    #[error("malformed response from {provider}: {reason}")]
    MalformedResponse { provider: String, reason: String },

    /// `config.toml` exists but cannot be read or parsed.
    #[error("invalid config at {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    /// A session name that is empty or not a plain file name.
    #[error("invalid session name '{0}'")]
    InvalidSessionName(String),

    /// `rm`/`rename` target does not exist.
    #[error("session '{0}' does not exist")]
    SessionNotFound(String),

    /// `rename` destination already exists.
    #[error("session '{0}' already exists")]
    SessionExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable process exit code for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EmptyPrompt => 2,
            Self::CredentialMissing | Self::AuthRejected { .. } => 3,
            Self::NoSessionAvailable => 4,
            Self::CorruptState { .. } => 5,
            Self::PersistFailure { .. } => 6,
            Self::Transport { .. } => 7,
            Self::RemoteService { .. } => 8,
            Self::MalformedResponse { .. } => 9,
            Self::InvalidConfig { .. } => 10,
            Self::InvalidSessionName(_)
            | Self::SessionNotFound(_)
            | Self::SessionExists(_)
            | Self::Io(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        let errors = [
            (Error::EmptyPrompt, 2),
            (Error::CredentialMissing, 3),
            (Error::NoSessionAvailable, 4),
            (
                Error::CorruptState {
                    name: "x".into(),
                    reason: "bad json".into(),
                },
                5,
            ),
            (
                Error::PersistFailure {
                    path: PathBuf::from("/tmp/x"),
                    source: std::io::Error::other("disk full"),
                },
                6,
            ),
            (
                Error::MalformedResponse {
                    provider: "openai".into(),
                    reason: "no choices".into(),
                },
                9,
            ),
        ];
        for (err, code) in errors {
            assert_eq!(err.exit_code(), code, "{err}");
        }
    }

    #[test]
    fn auth_rejection_shares_the_credential_exit_code() {
        let err = Error::AuthRejected {
            provider: "openai".into(),
            detail: "invalid key".into(),
        };
        assert_eq!(err.exit_code(), Error::CredentialMissing.exit_code());
    }

    #[test]
    fn messages_name_the_session() {
        let err = Error::CorruptState {
            name: "research".into(),
            reason: "expected value at line 1".into(),
        };
        assert!(err.to_string().contains("research"));
    }
}

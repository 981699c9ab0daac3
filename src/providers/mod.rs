//! Provider subsystem: the external completion service boundary.
//!
//! A single OpenAI-compatible backend today; the [`Provider`] trait is the
//! seam where tests plug in a scripted implementation.

pub mod openai;
pub mod traits;

pub use openai::OpenAiProvider;
pub use traits::{ChatMessage, Provider};

use crate::config::Config;
use crate::error::{Error, Result};

const MAX_API_ERROR_CHARS: usize = 200;

/// Token prefixes that must never surface in error output.
const SECRET_PREFIXES: [&str; 3] = ["sk-", "sess-", "Bearer "];

/// Resolve the API credential: explicit value first, then environment.
/// Checked before any session work begins.
fn resolve_credential(explicit: Option<&str>) -> Option<String> {
    if let Some(key) = explicit {
        let key = key.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }

    for var in ["GPTCLI_API_KEY", "OPENAI_API_KEY"] {
        if let Ok(value) = std::env::var(var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Factory: create the completion provider, failing fast when no credential
/// is available.
pub fn create_provider(config: &Config, api_key: Option<&str>) -> Result<Box<dyn Provider>> {
    let key = resolve_credential(api_key).ok_or(Error::CredentialMissing)?;
    Ok(Box::new(OpenAiProvider::new(
        config.api_url.as_deref(),
        &key,
    )))
}

fn secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Replace secret-looking tokens with `[redacted]`.
fn redact_secrets(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    'scan: while !rest.is_empty() {
        for prefix in SECRET_PREFIXES {
            if let Some(tail) = rest.strip_prefix(prefix) {
                let token_len: usize = tail
                    .chars()
                    .take_while(|c| secret_char(*c))
                    .map(char::len_utf8)
                    .sum();
                if token_len > 0 {
                    out.push_str("[redacted]");
                    rest = &tail[token_len..];
                    continue 'scan;
                }
            }
        }
        let c = rest.chars().next().expect("non-empty rest");
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Sanitize a provider error body: scrub secrets, then bound the length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = redact_secrets(input.trim());

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &scrubbed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_with_explicit_key() {
        let provider = create_provider(&Config::default(), Some("sk-unit-test")).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn explicit_blank_key_does_not_count() {
        assert!(resolve_credential(Some("   "))
            .map(|k| k != "   ")
            .unwrap_or(true));
    }

    #[test]
    fn redacts_api_keys_in_error_bodies() {
        let out = sanitize_api_error("invalid key sk-abc123DEF provided");
        assert!(!out.contains("sk-abc123DEF"));
        assert!(out.contains("[redacted]"));
    }

    #[test]
    fn redacts_bearer_tokens() {
        let out = sanitize_api_error("header was: Bearer sk-proj-42xyz");
        assert!(!out.contains("42xyz"));
    }

    #[test]
    fn plain_errors_pass_through() {
        let input = "upstream timed out";
        assert_eq!(sanitize_api_error(input), input);
    }

    #[test]
    fn long_errors_are_truncated() {
        let long = "e".repeat(500);
        let out = sanitize_api_error(&long);
        assert!(out.len() <= MAX_API_ERROR_CHARS + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn bare_prefix_without_token_is_left_alone() {
        let input = "costs in sk- denominated units";
        assert_eq!(sanitize_api_error(input), input);
    }
}

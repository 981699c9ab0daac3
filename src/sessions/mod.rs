//! Session management - named, durable conversations and the last-used
//! pointer that lets a run resume the previous one implicitly.

pub mod fs;
pub mod in_memory;
pub mod traits;

pub use fs::FsSessionStore;
pub use in_memory::InMemorySessionStore;
pub use traits::{resolve_name, sanitize_name, Session, SessionConfig, SessionStore, Turn};

use crate::error::Result;
use std::path::Path;

/// Create the production session store rooted at the state directory.
pub async fn create_session_store(state_dir: &Path) -> Result<Box<dyn SessionStore>> {
    Ok(Box::new(FsSessionStore::open(state_dir).await?))
}

//! Filesystem session store: one JSON record per session under the state
//! directory, plus a single pointer record naming the last-used session.
//!
//! All writes go to a temporary file in the same directory followed by an
//! atomic rename, so an interrupted run never leaves a partially written
//! record visible.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::traits::{sanitize_name, Session, SessionStore};

/// File name of the last-used pointer record. Hidden so it never collides
/// with a session name (sanitization rejects leading dots).
const LAST_USED_FILE: &str = ".last_state";

pub struct FsSessionStore {
    dir: PathBuf,
}

impl FsSessionStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn session_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn pointer_path(&self) -> PathBuf {
        self.dir.join(LAST_USED_FILE)
    }

    /// Write `contents` to `path` via a hidden sibling temp file and an
    /// atomic rename. Any failure maps to [`Error::PersistFailure`] and
    /// leaves the previous record untouched.
    async fn atomic_write(&self, path: &Path, contents: &str) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("record");
        let tmp = self.dir.join(format!(".{file_name}.tmp"));

        let persist_err = |source: std::io::Error| Error::PersistFailure {
            path: path.to_path_buf(),
            source,
        };

        fs::write(&tmp, contents).await.map_err(persist_err)?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(persist_err(e));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FsSessionStore {
    async fn load_or_create(&self, name: &str) -> Result<Session> {
        let name = sanitize_name(name)?;
        let path = self.session_path(&name);

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Session::new(name));
            }
            Err(e) => {
                return Err(Error::CorruptState {
                    name,
                    reason: e.to_string(),
                })
            }
        };

        let mut session: Session =
            serde_json::from_str(&raw).map_err(|e| Error::CorruptState {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        session.name = name;
        Ok(session)
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let name = sanitize_name(&session.name)?;
        let path = self.session_path(&name);
        let contents =
            serde_json::to_string_pretty(session).map_err(|e| Error::PersistFailure {
                path: path.clone(),
                source: std::io::Error::other(e),
            })?;
        self.atomic_write(&path, &contents).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                // Pointer, temp files, and config live alongside the records.
                if name.starts_with('.') || name == "config.toml" {
                    continue;
                }
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let name = sanitize_name(name)?;
        match fs::remove_file(self.session_path(&name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SessionNotFound(name));
            }
            Err(e) => return Err(e.into()),
        }

        if self.last_used().await?.as_deref() == Some(name.as_str()) {
            self.clear_last_used().await?;
        }
        Ok(())
    }

    async fn rename(&self, old: &str, new: &str) -> Result<()> {
        let old = sanitize_name(old)?;
        let new = sanitize_name(new)?;

        let old_path = self.session_path(&old);
        let new_path = self.session_path(&new);
        if fs::metadata(&old_path).await.is_err() {
            return Err(Error::SessionNotFound(old));
        }
        if fs::metadata(&new_path).await.is_ok() {
            return Err(Error::SessionExists(new));
        }

        fs::rename(&old_path, &new_path).await?;

        if self.last_used().await?.as_deref() == Some(old.as_str()) {
            self.set_last_used(&new).await?;
        }
        Ok(())
    }

    async fn last_used(&self) -> Result<Option<String>> {
        // An unreadable pointer reads as absent: it is a convenience record,
        // losing it only costs the caller an explicit -s.
        let raw = match fs::read_to_string(self.pointer_path()).await {
            Ok(raw) => raw,
            Err(_) => return Ok(None),
        };
        let name = raw.trim();
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }

    async fn set_last_used(&self, name: &str) -> Result<()> {
        self.atomic_write(&self.pointer_path(), name).await
    }

    async fn clear_last_used(&self) -> Result<()> {
        match fs::remove_file(self.pointer_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::traits::{SessionConfig, Turn};

    async fn store() -> (tempfile::TempDir, FsSessionStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsSessionStore::open(tmp.path()).await.unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn load_or_create_returns_empty_session_when_absent() {
        let (_tmp, store) = store().await;
        let session = store.load_or_create("fresh").await.unwrap();
        assert_eq!(session.name, "fresh");
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_structurally() {
        let (_tmp, store) = store().await;
        let mut session = Session::new("research");
        session.history = vec![
            Turn::user("Outline my idea"),
            Turn::assistant("1. Intro"),
            Turn::user("Expand point one"),
        ];
        session.config = SessionConfig {
            system_prompt: Some("Be terse.".into()),
            model: Some("gpt-4o".into()),
            temperature: Some(0.9),
        };

        store.save(&session).await.unwrap();
        let loaded = store.load_or_create("research").await.unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error_not_a_reset() {
        let (tmp, store) = store().await;
        std::fs::write(tmp.path().join("broken"), "not json at all").unwrap();

        let err = store.load_or_create("broken").await.unwrap_err();
        assert!(matches!(err, Error::CorruptState { ref name, .. } if name == "broken"));
        // The record is still on disk for manual recovery.
        assert!(tmp.path().join("broken").exists());
    }

    #[tokio::test]
    async fn save_leaves_no_temp_residue() {
        let (tmp, store) = store().await;
        store.save(&Session::new("clean")).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "leftover temp files: {leftovers:?}");
    }

    #[tokio::test]
    async fn failed_save_keeps_prior_state_intact() {
        let (tmp, store) = store().await;
        // A directory squatting on the record path makes the rename fail.
        std::fs::create_dir(tmp.path().join("blocked")).unwrap();

        let err = store.save(&Session::new("blocked")).await.unwrap_err();
        assert!(matches!(err, Error::PersistFailure { .. }));
        assert!(tmp.path().join("blocked").is_dir());
    }

    #[tokio::test]
    async fn pointer_is_absent_until_written() {
        let (_tmp, store) = store().await;
        assert_eq!(store.last_used().await.unwrap(), None);

        store.set_last_used("research").await.unwrap();
        assert_eq!(store.last_used().await.unwrap().as_deref(), Some("research"));

        store.clear_last_used().await.unwrap();
        assert_eq!(store.last_used().await.unwrap(), None);
    }

    #[tokio::test]
    async fn blank_pointer_reads_as_absent() {
        let (tmp, store) = store().await;
        std::fs::write(tmp.path().join(".last_state"), "  \n").unwrap();
        assert_eq!(store.last_used().await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_excludes_pointer_config_and_temp_files() {
        let (tmp, store) = store().await;
        store.save(&Session::new("alpha")).await.unwrap();
        store.save(&Session::new("beta")).await.unwrap();
        store.set_last_used("alpha").await.unwrap();
        std::fs::write(tmp.path().join("config.toml"), "").unwrap();

        let mut names = store.list().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn delete_removes_record_and_clears_matching_pointer() {
        let (tmp, store) = store().await;
        store.save(&Session::new("doomed")).await.unwrap();
        store.set_last_used("doomed").await.unwrap();

        store.delete("doomed").await.unwrap();
        assert!(!tmp.path().join("doomed").exists());
        assert_eq!(store.last_used().await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_keeps_pointer_naming_another_session() {
        let (_tmp, store) = store().await;
        store.save(&Session::new("keep")).await.unwrap();
        store.save(&Session::new("drop")).await.unwrap();
        store.set_last_used("keep").await.unwrap();

        store.delete("drop").await.unwrap();
        assert_eq!(store.last_used().await.unwrap().as_deref(), Some("keep"));
    }

    #[tokio::test]
    async fn delete_missing_session_errors() {
        let (_tmp, store) = store().await;
        let err = store.delete("ghost").await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(ref n) if n == "ghost"));
    }

    #[tokio::test]
    async fn rename_moves_record_and_pointer() {
        let (tmp, store) = store().await;
        let mut session = Session::new("draft");
        session.append_exchange("q", "a");
        store.save(&session).await.unwrap();
        store.set_last_used("draft").await.unwrap();

        store.rename("draft", "final").await.unwrap();
        assert!(!tmp.path().join("draft").exists());
        let loaded = store.load_or_create("final").await.unwrap();
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(store.last_used().await.unwrap().as_deref(), Some("final"));
    }

    #[tokio::test]
    async fn rename_refuses_to_clobber() {
        let (_tmp, store) = store().await;
        store.save(&Session::new("a")).await.unwrap();
        store.save(&Session::new("b")).await.unwrap();

        let err = store.rename("a", "b").await.unwrap_err();
        assert!(matches!(err, Error::SessionExists(ref n) if n == "b"));
    }

    #[tokio::test]
    async fn rename_missing_source_errors() {
        let (_tmp, store) = store().await;
        let err = store.rename("ghost", "new").await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(ref n) if n == "ghost"));
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("state");
        FsSessionStore::open(&dir).await.unwrap();
        FsSessionStore::open(&dir).await.unwrap();
        assert!(dir.is_dir());
    }
}

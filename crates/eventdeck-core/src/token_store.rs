//! Bearer token persistence.
//!
//! The file store keeps the token and the identity it was issued for in
//! `<home>/session.json` with restricted permissions (0600).
//! Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::types::User;
use crate::config::paths;

/// What survives between runs: the token and who it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
}

/// Persistent holder of the current bearer token.
///
/// Only the session coordinator writes through this trait.
pub trait TokenStore: Send + Sync {
    /// Returns the persisted session, or `None` when signed out.
    ///
    /// # Errors
    /// Returns an error if the backing storage can't be read.
    fn load(&self) -> Result<Option<StoredSession>>;

    /// Persists the session, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the backing storage can't be written.
    fn save(&self, session: &StoredSession) -> Result<()>;

    /// Removes the persisted session. Returns whether one existed.
    ///
    /// # Errors
    /// Returns an error if the backing storage can't be modified.
    fn clear(&self) -> Result<bool>;

    /// Returns just the token.
    ///
    /// # Errors
    /// Returns an error if the backing storage can't be read.
    fn get_token(&self) -> Result<Option<String>> {
        Ok(self.load()?.map(|s| s.token))
    }
}

/// Token store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<EVENTDECK_HOME>/session.json`.
    pub fn default_location() -> Self {
        Self::new(paths::session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&contents)
            .map(Some)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        Ok(true)
    }
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Option<StoredSession>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.lock().clone())
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        *self.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        Ok(self.lock().take().is_some())
    }
}

/// Masks a token for display: first 12 chars, or `***` for short tokens.
pub fn mask_token(token: &str) -> String {
    match token.char_indices().nth(12) {
        Some((cut, _)) if token.len() > 16 => format!("{}...", &token[..cut]),
        _ => "***".to_string(),
    }
}

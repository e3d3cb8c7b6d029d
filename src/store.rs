//! Persisted token storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session survives process restarts as two entries: the bearer token
//! (`auth_token`) and its absolute expiry in epoch milliseconds
//! (`token_expiry`). The session manager is the only writer.
//!
//! ERROR HANDLING
//! ==============
//! Write failures are returned so the manager can keep memory and disk in
//! step. An unreadable or corrupt file loads as "no session": the worst
//! outcome is a fresh login, never a crash at startup.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SessionError;

/// Session file name inside the state directory.
pub const SESSION_FILE: &str = "session.json";

/// The persisted pair. Both fields are present or the entry does not exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedToken {
    pub auth_token: String,
    /// Absolute expiry, milliseconds since the Unix epoch.
    pub token_expiry: u64,
}

/// Key/value store holding at most one [`PersistedToken`]. Last write wins.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any.
    fn load(&self) -> Option<PersistedToken>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the write fails.
    fn save(&self, token: &PersistedToken) -> Result<(), SessionError>;

    /// Remove the stored token. Removing an absent token succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the removal fails.
    fn clear(&self) -> Result<(), SessionError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON file under the state directory, owner read/write only on unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(state_dir: &Path) -> Self {
        Self { path: state_dir.join(SESSION_FILE) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<PersistedToken> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file unreadable; treating as logged out");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file corrupt; treating as logged out");
                None
            }
        }
    }

    fn save(&self, token: &PersistedToken) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SessionError::Store(format!("create {}: {e}", parent.display())))?;
        }
        let contents = serde_json::to_string_pretty(token).map_err(|e| SessionError::Store(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(|e| SessionError::Store(format!("open {}: {e}", self.path.display())))?;
            file.write_all(contents.as_bytes())
                .map_err(|e| SessionError::Store(format!("write {}: {e}", self.path.display())))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = fs::File::create(&self.path)
                .map_err(|e| SessionError::Store(format!("open {}: {e}", self.path.display())))?;
            file.write_all(contents.as_bytes())
                .map_err(|e| SessionError::Store(format!("write {}: {e}", self.path.display())))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Store(format!("remove {}: {e}", self.path.display()))),
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<PersistedToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `token`, as if a previous process had saved it.
    #[must_use]
    pub fn with_token(token: PersistedToken) -> Self {
        Self { slot: Mutex::new(Some(token)) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<PersistedToken> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn save(&self, token: &PersistedToken) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}

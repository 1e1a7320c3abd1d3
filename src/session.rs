//! Session Store: the single operator credential.
//!
//! DESIGN
//! ======
//! One guarded `Option<Token>` sits in front of a [`TokenStorage`] area.
//! Reads never touch storage; writes go to storage and memory together so a
//! reload (a new process opening the same file) sees the same state.
//! Clones of [`SessionStore`] share one slot, so an eviction from any call
//! site is visible to every other holder on its next `get()`.
//!
//! The session is either fully present or fully absent. There is no
//! refresh state, and the token is never inspected.

use std::fmt;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

const APP_DIR_NAME: &str = "backoffice";
const SESSION_FILE_NAME: &str = "session.json";

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("refusing to store an empty credential")]
    EmptyToken,
    #[error("session storage I/O failed at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session file {} is not valid: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not determine the user config directory")]
    NoConfigDir,
}

// =============================================================================
// TOKEN
// =============================================================================

/// Opaque bearer credential. Guaranteed non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw credential.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyToken`] for an empty or whitespace-only value.
    pub fn new(raw: impl Into<String>) -> Result<Self, SessionError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

// =============================================================================
// STORAGE AREAS
// =============================================================================

/// Persistence area behind the store.
pub trait TokenStorage: Send + Sync {
    /// Read the persisted credential, if any.
    fn load(&self) -> Result<Option<Token>, SessionError>;
    /// Replace the persisted credential.
    fn save(&self, token: &Token) -> Result<(), SessionError>;
    /// Remove the persisted credential. Removing nothing is not an error.
    fn remove(&self) -> Result<(), SessionError>;
}

/// Process-local storage; forgets everything on exit.
#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<Token>>,
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Token>, SessionError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &Token) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// On-disk shape; the credential lives under the `token` key.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// JSON file holding `{"token": "..."}`, the on-disk analogue of browser storage.
///
/// Writes go to a sibling temp file and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at `<config dir>/backoffice/session.json`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoConfigDir`] when the platform has no config directory.
    pub fn new() -> Result<Self, SessionError> {
        let dir = dirs::config_dir().ok_or(SessionError::NoConfigDir)?;
        Ok(Self { path: dir.join(APP_DIR_NAME).join(SESSION_FILE_NAME) })
    }

    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SessionError {
        SessionError::Storage { path: self.path.clone(), source }
    }
}

impl TokenStorage for FileStorage {
    fn load(&self) -> Result<Option<Token>, SessionError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let stored: StoredSession = serde_json::from_str(&content)
            .map_err(|source| SessionError::Corrupt { path: self.path.clone(), source })?;
        Ok(Token::new(stored.token).ok())
    }

    fn save(&self, token: &Token) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_vec_pretty(&StoredSession { token: token.as_str().to_owned() })
            .map_err(|source| SessionError::Corrupt { path: self.path.clone(), source })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).map_err(|e| self.io_error(e))?;
        file.write_all(&body).map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600)).map_err(|e| self.io_error(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))
    }

    fn remove(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// =============================================================================
// SESSION STORE
// =============================================================================

/// Shared handle to the current credential.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    current: RwLock<Option<Token>>,
    storage: Box<dyn TokenStorage>,
}

impl SessionStore {
    /// Open a store over `storage`, picking up any persisted credential.
    ///
    /// An unreadable session file counts as no session: the operator logs in
    /// again and the next `set` overwrites it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] when the storage area itself cannot be read.
    pub fn open(storage: impl TokenStorage + 'static) -> Result<Self, SessionError> {
        let current = match storage.load() {
            Ok(token) => token,
            Err(SessionError::Corrupt { path, source }) => {
                tracing::warn!(path = %path.display(), error = %source, "ignoring unreadable session file");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self { inner: Arc::new(StoreInner { current: RwLock::new(current), storage: Box::new(storage) }) })
    }

    /// Store with no persistence, starting absent.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(StoreInner { current: RwLock::new(None), storage: Box::new(MemoryStorage::default()) }),
        }
    }

    /// Current credential, if any.
    #[must_use]
    pub fn get(&self) -> Option<Token> {
        self.inner.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.inner.current.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Install a credential, replacing any prior one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyToken`] for an empty value, or a storage
    /// error if it could not be persisted (the in-memory session is then
    /// left unchanged).
    pub fn set(&self, raw: impl Into<String>) -> Result<Token, SessionError> {
        let token = Token::new(raw)?;
        let mut current = self.inner.current.write().unwrap_or_else(PoisonError::into_inner);
        self.inner.storage.save(&token)?;
        *current = Some(token.clone());
        Ok(token)
    }

    /// Drop the credential. Idempotent.
    ///
    /// Memory is cleared before storage so the eviction is visible even when
    /// the storage area fails.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the persisted copy could not be removed.
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut current = self.inner.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = None;
        self.inner.storage.remove()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").field("present", &self.is_present()).finish()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

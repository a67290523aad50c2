//! Session token storage
//!
//! A single token slot with an expiry stamped at save time. The file store
//! plays the part of the browser's origin-scoped cookie; the memory store
//! is the same contract without touching disk.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Opaque bearer credential, never empty
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token string, rejecting empty or whitespace-only input
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keeps tokens out of logs and panic messages.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Storage for the single session token
pub trait CredentialStore {
    /// Persist the token, replacing any previous one
    fn save(&self, token: &SessionToken) -> Result<()>;

    /// Current token, or `None` when absent or expired
    fn read(&self) -> Result<Option<SessionToken>>;

    /// Remove the token; succeeds when nothing is stored
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Token persisted as JSON in a single file
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    ttl: Duration,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Expiry of the stored token, if one is stored
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.load()?.map(|stored| stored.expires_at))
    }

    fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::FileReadError {
            path: self.path.display().to_string(),
            source: e,
        })?;

        match serde_json::from_str(&content) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!("Discarding unreadable session file {:?}: {}", self.path, e);
                self.clear()?;
                Ok(None)
            }
        }
    }

    fn write_restricted(&self, content: &[u8]) -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        file.write_all(content)?;
        file.flush()?;

        // mode() only applies on create; tighten a file left by an older save
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &SessionToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::FileWriteError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let expires_at = Utc::now().checked_add_signed(self.ttl).ok_or_else(|| {
            Error::ConfigError(format!(
                "session lifetime of {} days is out of range",
                self.ttl.num_days()
            ))
        })?;
        let stored = StoredSession {
            token: token.as_str().to_string(),
            expires_at,
        };

        let content = serde_json::to_string_pretty(&stored)?;
        self.write_restricted(content.as_bytes()).map_err(|e| Error::FileWriteError {
            path: self.path.display().to_string(),
            source: e,
        })?;

        debug!("Saved session token to {:?}", self.path);
        Ok(())
    }

    fn read(&self) -> Result<Option<SessionToken>> {
        let Some(stored) = self.load()? else {
            return Ok(None);
        };

        if stored.expires_at <= Utc::now() {
            debug!("Stored session expired at {}", stored.expires_at);
            self.clear()?;
            return Ok(None);
        }

        Ok(SessionToken::new(stored.token))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed session file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::FileWriteError {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }
}

/// In-process token slot
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<SessionToken>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: SessionToken) -> Self {
        Self {
            slot: Mutex::new(Some(token)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &SessionToken) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        Ok(())
    }

    fn read(&self) -> Result<Option<SessionToken>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn token(s: &str) -> SessionToken {
        SessionToken::new(s).unwrap()
    }

    #[test]
    fn test_session_token_rejects_empty() {
        assert!(SessionToken::new("").is_none());
        assert!(SessionToken::new("   \n").is_none());
        assert_eq!(SessionToken::new(" abc \n").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_session_token_debug_hides_value() {
        let rendered = format!("{:?}", token("secret-jwt"));
        assert!(!rendered.contains("secret-jwt"));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested/session.json"), Duration::days(7));

        assert_eq!(store.read().unwrap(), None);

        store.save(&token("jwt-1")).unwrap();
        assert_eq!(store.read().unwrap(), Some(token("jwt-1")));

        let expires = store.expires_at().unwrap().unwrap();
        assert!(expires > Utc::now() + Duration::days(6));
        assert!(expires <= Utc::now() + Duration::days(7));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("session.json"), Duration::days(7));

        store.clear().unwrap();
        store.save(&token("jwt")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert_eq!(store.read().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_drops_expired_token() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("session.json"), Duration::seconds(-1));

        store.save(&token("stale")).unwrap();
        assert_eq!(store.read().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_treats_blank_token_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let expires = (Utc::now() + Duration::days(1)).to_rfc3339();
        std::fs::write(&path, format!(r#"{{"token": "  ", "expires_at": "{}"}}"#, expires)).unwrap();

        let store = FileCredentialStore::new(path, Duration::days(7));
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_file_store_discards_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(path, Duration::days(7));
        assert_eq!(store.read().unwrap(), None);
        assert!(!store.path().exists());

        store.save(&token("fresh")).unwrap();
        assert_eq!(store.read().unwrap(), Some(token("fresh")));
    }

    #[test]
    fn test_file_store_rejects_out_of_range_lifetime() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(
            dir.path().join("session.json"),
            Duration::days(1_000_000_000),
        );

        let result = store.save(&token("jwt"));

        assert!(matches!(result, Err(Error::ConfigError(_))));
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileCredentialStore::new(&path, Duration::days(7));
        store.save(&token("jwt")).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::remove_file(&path).unwrap();
        store.save(&token("jwt")).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.read().unwrap(), None);

        store.save(&token("a")).unwrap();
        store.save(&token("b")).unwrap();
        assert_eq!(store.read().unwrap(), Some(token("b")));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }
}

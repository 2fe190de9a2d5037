//! Session file on disk

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::UserProfile;

/// Sessions are kept for a fixed 30 days, whatever the token says.
pub const SESSION_LIFETIME_DAYS: i64 = 30;

const APP_DIR: &str = "crmdesk";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No config directory available for the session file")]
    NoConfigDir,
    #[error("Session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A signed-in user with the bearer token for the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub user: UserProfile,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl ActiveSession {
    pub fn new(user: UserProfile, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
            expires_at: Utc::now() + Duration::days(SESSION_LIFETIME_DAYS),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// `<config_dir>/crmdesk/session.json`
    pub fn default_location() -> Result<Self, SessionError> {
        let dir = dirs::config_dir().ok_or(SessionError::NoConfigDir)?;
        Ok(Self::at(dir.join(APP_DIR).join(SESSION_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session, or `None` when missing or expired.
    pub fn load(&self) -> Result<Option<ActiveSession>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };

        let session: ActiveSession =
            serde_json::from_str(&raw).map_err(|source| SessionError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if session.is_expired_at(Utc::now()) {
            tracing::info!(path = %self.path.display(), "stored session expired");
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn save(&self, session: &ActiveSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(session).map_err(|source| {
            SessionError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user() -> UserProfile {
        UserProfile::from_display_name("ada@acme.com", Some("Ada Lovelace"))
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::at(dir.path().join("nested").join("session.json"));
        assert!(store.load().unwrap().is_none());

        let session = ActiveSession::new(user(), "tok-1");
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_expired_session_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));

        let mut session = ActiveSession::new(user(), "tok-1");
        session.expires_at = Utc::now() - Duration::minutes(1);
        store.save(&session).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_lifetime_is_thirty_days() {
        let session = ActiveSession::new(user(), "tok-1");
        let remaining = session.expires_at - Utc::now();
        assert!(remaining > Duration::days(29));
        assert!(remaining <= Duration::days(30));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SessionStore::at(path).load(),
            Err(SessionError::Corrupt { .. })
        ));
    }
}

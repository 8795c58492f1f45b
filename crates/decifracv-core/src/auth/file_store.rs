use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::store::{CredentialStore, StoreError};
use super::SessionToken;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Session token persisted as JSON in the cache directory.
///
/// Survives restarts of the client but not a fresh profile. Writes go to a
/// temp file in the same directory which is then renamed over the session
/// file, so a crash mid-write leaves the old session intact.
pub struct FileCredentialStore {
    cache_dir: PathBuf,
    token: Option<SessionToken>,
}

impl FileCredentialStore {
    /// Open the store, loading any session persisted by a previous run.
    ///
    /// A session file that does not hold a well-formed token is discarded.
    pub fn open(cache_dir: PathBuf) -> Result<Self, StoreError> {
        let mut store = Self {
            cache_dir,
            token: None,
        };

        let path = store.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            match Self::decode(&contents) {
                Some(token) => {
                    debug!(path = %path.display(), "Loaded persisted session");
                    store.token = Some(token);
                }
                None => {
                    warn!(path = %path.display(), "Discarding malformed session file");
                    std::fs::remove_file(&path)?;
                }
            }
        }

        Ok(store)
    }

    fn decode(contents: &str) -> Option<SessionToken> {
        let persisted: PersistedSession = serde_json::from_str(contents).ok()?;
        SessionToken::parse(&persisted.token).ok()
    }

    pub fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn write_atomically(dir: &Path, path: &Path, contents: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(dir)?;
        // NamedTempFile is created with 0600 permissions on unix
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<SessionToken>, StoreError> {
        Ok(self.token.clone())
    }

    fn set(&mut self, token: &SessionToken) -> Result<(), StoreError> {
        let persisted = PersistedSession {
            token: token.as_str().to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&persisted)?;
        Self::write_atomically(&self.cache_dir, &self.session_path(), &contents)?;
        self.token = Some(token.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        self.token = None;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

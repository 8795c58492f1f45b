//! Credential store contract and the in-memory backend.

use thiserror::Error;

use super::SessionToken;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode session: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("No cache directory available for session storage")]
    NoStorageLocation,
}

/// Durable home of the current session token.
///
/// Implementations must apply `set` and `clear` atomically: `get` returns
/// either the previous value or the new one, never a partial write. A failed
/// write leaves `get` returning the previous value.
pub trait CredentialStore: Send {
    fn get(&self) -> Result<Option<SessionToken>, StoreError>;

    fn set(&mut self, token: &SessionToken) -> Result<(), StoreError>;

    fn clear(&mut self) -> Result<(), StoreError>;

    /// Backend name for log output
    fn backend(&self) -> &'static str;
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Option<SessionToken>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: SessionToken) -> Self {
        Self { token: Some(token) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<SessionToken>, StoreError> {
        Ok(self.token.clone())
    }

    fn set(&mut self, token: &SessionToken) -> Result<(), StoreError> {
        self.token = Some(token.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.token = None;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

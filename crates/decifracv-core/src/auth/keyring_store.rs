use keyring::Entry;
use tracing::{debug, warn};

use super::store::{CredentialStore, StoreError};
use super::SessionToken;

const SERVICE_NAME: &str = "decifracv";

/// Keychain account holding the session token
const SESSION_ACCOUNT: &str = "session-token";

/// Session token kept in the OS keychain.
pub struct KeyringCredentialStore {
    entry: Entry,
    token: Option<SessionToken>,
}

impl KeyringCredentialStore {
    /// Open the keychain entry and load any token stored by a previous run
    pub fn open() -> Result<Self, StoreError> {
        Self::open_account(SESSION_ACCOUNT)
    }

    pub fn open_account(account: &str) -> Result<Self, StoreError> {
        let entry = Entry::new(SERVICE_NAME, account)?;
        let token = match entry.get_password() {
            Ok(raw) => match SessionToken::parse(&raw) {
                Ok(token) => {
                    debug!(account, "Loaded session from keychain");
                    Some(token)
                }
                Err(e) => {
                    warn!(account, error = %e, "Discarding malformed keychain session");
                    Self::delete(&entry)?;
                    None
                }
            },
            Err(keyring::Error::NoEntry) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self { entry, token })
    }

    fn delete(entry: &Entry) -> Result<(), StoreError> {
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self) -> Result<Option<SessionToken>, StoreError> {
        Ok(self.token.clone())
    }

    fn set(&mut self, token: &SessionToken) -> Result<(), StoreError> {
        self.entry.set_password(token.as_str())?;
        self.token = Some(token.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        Self::delete(&self.entry)?;
        self.token = None;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "keyring"
    }
}

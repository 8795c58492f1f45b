//! Session and authorization.
//!
//! This module provides:
//! - `CredentialStore`: durable home of the session token (file, keychain or memory)
//! - `SessionController`: login/logout, the only writer of the store
//! - `AuthStrategy`: picks the bearer token, the static API key, or nothing
//! - `RouteGuard`: keeps protected views from rendering without a session
//!
//! There is no expiry timer. An expired token shows up as a 401 on next use
//! and is torn down by the request gateway.

pub mod file_store;
pub mod guard;
pub mod keyring_store;
pub mod session;
pub mod store;
pub mod strategy;
pub mod token;

pub use file_store::FileCredentialStore;
pub use guard::{Guarded, Route, RouteGuard, LOGIN_PATH};
pub use keyring_store::KeyringCredentialStore;
pub use session::{AuthState, LoginRequired, SessionController, SessionSnapshot};
pub use store::{CredentialStore, MemoryCredentialStore, StoreError};
pub use strategy::{AuthStrategy, Credential, API_KEY_HEADER};
pub use token::{SessionToken, StaticCredential, TokenError};

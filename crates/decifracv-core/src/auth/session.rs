//! Session controller: the only writer of the credential store.
//!
//! Every transition runs under one lock that covers the live token, the epoch
//! bump and the publication of the new [`AuthState`], so no observer can see
//! a token that disagrees with the published state. Login-required listeners
//! run after the lock is released but before the transition call returns.
//!
//! The store is the durable copy. Login and logout write it first and only
//! then change the live session. A rejected session is dropped from memory
//! before the store is cleared, so a failing store can never put the token
//! back on the wire.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::store::{CredentialStore, StoreError};
use super::SessionToken;

/// Published authentication state, derived from the stored token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub is_authenticated: bool,
}

impl AuthState {
    pub const ANONYMOUS: AuthState = AuthState { is_authenticated: false };
    pub const AUTHENTICATED: AuthState = AuthState { is_authenticated: true };

    pub fn from_token(token: Option<&SessionToken>) -> Self {
        Self {
            is_authenticated: token.is_some(),
        }
    }
}

/// Why the host should send the user to the login entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRequired {
    /// Explicit logout
    LoggedOut,
    /// The backend rejected the credential (HTTP 401)
    Unauthorized,
}

/// Consistent view of the session taken when a request resolves its credential.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub epoch: u64,
    pub token: Option<SessionToken>,
}

type LoginRequiredListener = Arc<dyn Fn(LoginRequired) + Send + Sync>;

struct Inner {
    store: Box<dyn CredentialStore>,
    /// Live session; what outbound requests are signed with.
    token: Option<SessionToken>,
    /// Bumped on every login/logout so late 401s can be matched to the
    /// session that issued them.
    epoch: u64,
    /// Set once login-required has fired for the current anonymous period.
    redirect_issued: bool,
}

pub struct SessionController {
    inner: Mutex<Inner>,
    state: watch::Sender<AuthState>,
    listeners: Mutex<Vec<LoginRequiredListener>>,
}

impl SessionController {
    /// Create the controller, publishing whatever session the store holds.
    pub fn new(store: Box<dyn CredentialStore>) -> Result<Self, StoreError> {
        let token = store.get()?;
        let initial = AuthState::from_token(token.as_ref());
        debug!(backend = store.backend(), authenticated = initial.is_authenticated, "Session initialized");

        let (state, _) = watch::channel(initial);
        Ok(Self {
            inner: Mutex::new(Inner {
                store,
                token,
                epoch: 0,
                redirect_issued: false,
            }),
            state,
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Store `token` and publish the authenticated state.
    ///
    /// The token is not inspected beyond well-formedness; the backend decides
    /// whether it is any good.
    pub fn login(&self, token: SessionToken) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.store.set(&token)?;
        inner.token = Some(token);
        inner.epoch += 1;
        inner.redirect_issued = false;
        self.state.send_replace(AuthState::AUTHENTICATED);
        info!(epoch = inner.epoch, "Session established");
        Ok(())
    }

    /// Clear the session. Calling this while anonymous does nothing.
    pub fn logout(&self) -> Result<(), StoreError> {
        let fired = {
            let mut inner = self.inner.lock();
            if inner.token.is_none() {
                debug!("Logout while anonymous, nothing to do");
                return Ok(());
            }
            inner.store.clear()?;
            self.end_session(&mut inner);
            info!(epoch = inner.epoch, "Logged out");
            Self::claim_redirect(&mut inner)
        };
        if fired {
            self.notify(LoginRequired::LoggedOut);
        }
        Ok(())
    }

    /// React to a 401 for a request issued under `epoch`.
    ///
    /// Tears the session down only if it is still the one that made the
    /// request; a rejection that arrives after logout or after a newer login
    /// is absorbed. Login-required fires at most once per anonymous period,
    /// however many rejections arrive.
    ///
    /// The session is over even when the durable clear fails; that failure
    /// is returned after listeners have run.
    pub fn handle_unauthorized(&self, epoch: u64) -> Result<(), StoreError> {
        let (fired, cleared) = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                debug!(request_epoch = epoch, current_epoch = inner.epoch, "Ignoring 401 from a previous session");
                return Ok(());
            }
            let mut cleared = Ok(());
            if inner.token.is_some() {
                self.end_session(&mut inner);
                cleared = inner.store.clear();
                match cleared {
                    Ok(()) => warn!(epoch = inner.epoch, "Session rejected by server, credentials cleared"),
                    Err(ref e) => warn!(
                        epoch = inner.epoch,
                        error = %e,
                        "Session rejected by server, but the stored copy could not be cleared"
                    ),
                }
            }
            (Self::claim_redirect(&mut inner), cleared)
        };
        if fired {
            self.notify(LoginRequired::Unauthorized);
        }
        cleared
    }

    fn end_session(&self, inner: &mut Inner) {
        inner.token = None;
        inner.epoch += 1;
        self.state.send_replace(AuthState::ANONYMOUS);
    }

    fn claim_redirect(inner: &mut Inner) -> bool {
        !std::mem::replace(&mut inner.redirect_issued, true)
    }

    fn notify(&self, reason: LoginRequired) {
        // Clone out so a listener may call back into the controller
        let listeners: Vec<LoginRequiredListener> = self.listeners.lock().clone();
        for listener in listeners {
            listener(reason);
        }
    }

    /// Register a listener for "send the user to login".
    ///
    /// The host decides what navigation means; the controller only promises
    /// one call per end of session.
    pub fn on_login_required<F>(&self, listener: F)
    where
        F: Fn(LoginRequired) + Send + Sync + 'static,
    {
        self.listeners.lock().push(Arc::new(listener));
    }

    /// Current published state
    pub fn auth_state(&self) -> AuthState {
        *self.state.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state().is_authenticated
    }

    /// Receiver that always holds the latest published state
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Read token and epoch together for one outbound request
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            epoch: inner.epoch,
            token: inner.token.clone(),
        }
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.snapshot().token
    }

    pub fn backend(&self) -> &'static str {
        self.inner.lock().store.backend()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::auth::MemoryCredentialStore;

    fn token(raw: &str) -> SessionToken {
        SessionToken::parse(raw).unwrap()
    }

    fn controller() -> SessionController {
        SessionController::new(Box::new(MemoryCredentialStore::new())).unwrap()
    }

    fn count_redirects(session: &SessionController) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        session.on_login_required(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    /// Store that fails every write
    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn get(&self) -> Result<Option<SessionToken>, StoreError> {
            Ok(None)
        }
        fn set(&mut self, _: &SessionToken) -> Result<(), StoreError> {
            Err(StoreError::NoStorageLocation)
        }
        fn clear(&mut self) -> Result<(), StoreError> {
            Err(StoreError::NoStorageLocation)
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    /// Store that accepts tokens but cannot remove them
    #[derive(Default)]
    struct StickyStore {
        token: Option<SessionToken>,
    }

    impl CredentialStore for StickyStore {
        fn get(&self) -> Result<Option<SessionToken>, StoreError> {
            Ok(self.token.clone())
        }
        fn set(&mut self, token: &SessionToken) -> Result<(), StoreError> {
            self.token = Some(token.clone());
            Ok(())
        }
        fn clear(&mut self) -> Result<(), StoreError> {
            Err(StoreError::NoStorageLocation)
        }
        fn backend(&self) -> &'static str {
            "sticky"
        }
    }

    #[test]
    fn test_initial_state_follows_store() {
        assert_eq!(controller().auth_state(), AuthState::ANONYMOUS);

        let stored = MemoryCredentialStore::with_token(token("persisted"));
        let session = SessionController::new(Box::new(stored)).unwrap();
        assert_eq!(session.auth_state(), AuthState::AUTHENTICATED);
        assert_eq!(session.token(), Some(token("persisted")));
    }

    #[test]
    fn test_login_then_logout() {
        let session = controller();
        session.login(token("abc123")).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some(token("abc123")));

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[test]
    fn test_logout_twice_notifies_once() {
        let session = controller();
        let redirects = count_redirects(&session);
        session.login(token("abc123")).unwrap();

        session.logout().unwrap();
        session.logout().unwrap();

        assert_eq!(session.auth_state(), AuthState::ANONYMOUS);
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_logout_while_anonymous_is_noop() {
        let session = controller();
        let redirects = count_redirects(&session);
        session.logout().unwrap();
        assert_eq!(redirects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribers_see_state_before_login_returns() {
        let session = controller();
        let rx = session.subscribe();
        assert!(!rx.borrow().is_authenticated);

        session.login(token("abc123")).unwrap();
        assert!(rx.borrow().is_authenticated);
        assert!(rx.has_changed().unwrap());

        session.logout().unwrap();
        assert!(!rx.borrow().is_authenticated);
    }

    #[test]
    fn test_listener_observes_cleared_state() {
        let session = Arc::new(controller());
        let observed = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&session);
        let sink = observed.clone();
        session.on_login_required(move |reason| {
            let state = weak.upgrade().map(|s| s.auth_state());
            sink.lock().push((reason, state));
        });

        session.login(token("abc123")).unwrap();
        let epoch = session.snapshot().epoch;
        session.handle_unauthorized(epoch).unwrap();

        let observed = observed.lock();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0], (LoginRequired::Unauthorized, Some(AuthState::ANONYMOUS)));
    }

    #[test]
    fn test_repeated_unauthorized_collapses() {
        let session = controller();
        let redirects = count_redirects(&session);
        session.login(token("abc123")).unwrap();
        let epoch = session.snapshot().epoch;

        session.handle_unauthorized(epoch).unwrap();
        session.handle_unauthorized(epoch).unwrap();
        session.handle_unauthorized(epoch).unwrap();

        assert!(!session.is_authenticated());
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_unauthorized_does_not_end_new_session() {
        let session = controller();
        let redirects = count_redirects(&session);

        session.login(token("first")).unwrap();
        let old_epoch = session.snapshot().epoch;
        session.login(token("second")).unwrap();

        session.handle_unauthorized(old_epoch).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some(token("second")));
        assert_eq!(redirects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unauthorized_after_logout_is_absorbed() {
        let session = controller();
        let redirects = count_redirects(&session);

        session.login(token("abc123")).unwrap();
        let epoch = session.snapshot().epoch;
        session.logout().unwrap();
        session.handle_unauthorized(epoch).unwrap();

        assert!(!session.is_authenticated());
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_anonymous_unauthorized_redirects_once_until_login() {
        let session = controller();
        let redirects = count_redirects(&session);
        let epoch = session.snapshot().epoch;

        session.handle_unauthorized(epoch).unwrap();
        session.handle_unauthorized(epoch).unwrap();
        assert_eq!(redirects.load(Ordering::SeqCst), 1);

        session.login(token("abc123")).unwrap();
        let epoch = session.snapshot().epoch;
        session.handle_unauthorized(epoch).unwrap();
        assert_eq!(redirects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_store_failure_leaves_state_untouched() {
        let session = SessionController::new(Box::new(BrokenStore)).unwrap();
        assert!(session.login(token("abc123")).is_err());
        assert!(!session.is_authenticated());
        assert_eq!(session.snapshot().epoch, 0);
    }

    #[test]
    fn test_rejected_session_ends_even_if_store_cannot_clear() {
        let session = SessionController::new(Box::new(StickyStore::default())).unwrap();
        let redirects = count_redirects(&session);
        session.login(token("abc123")).unwrap();
        let epoch = session.snapshot().epoch;

        assert!(matches!(
            session.handle_unauthorized(epoch),
            Err(StoreError::NoStorageLocation)
        ));
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert_ne!(session.snapshot().epoch, epoch);
        assert_eq!(redirects.load(Ordering::SeqCst), 1);

        // Later rejections of the same session are absorbed quietly
        session.handle_unauthorized(epoch).unwrap();
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_logout_keeps_session_if_store_cannot_clear() {
        let session = SessionController::new(Box::new(StickyStore::default())).unwrap();
        let redirects = count_redirects(&session);
        session.login(token("abc123")).unwrap();

        assert!(session.logout().is_err());
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some(token("abc123")));
        assert_eq!(redirects.load(Ordering::SeqCst), 0);
    }
}

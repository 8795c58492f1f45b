//! Chooses the single credential attached to an outbound request.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, AUTHORIZATION};
use tracing::debug;

use super::session::{SessionController, SessionSnapshot};
use super::{SessionToken, StaticCredential};

/// Header carrying the company API key
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Identity a request is sent under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(SessionToken),
    ApiKey(StaticCredential),
    Anonymous,
}

impl Credential {
    pub fn mode(&self) -> &'static str {
        match self {
            Credential::Bearer(_) => "bearer",
            Credential::ApiKey(_) => "api-key",
            Credential::Anonymous => "anonymous",
        }
    }

    /// Lay this credential over the caller's headers.
    ///
    /// When a credential applies, caller-supplied `Authorization` and
    /// `x-api-key` entries are dropped so the request carries exactly one
    /// identity. Anonymous requests keep the caller's headers untouched.
    pub fn apply(&self, mut headers: HeaderMap) -> HeaderMap {
        match self {
            Credential::Bearer(token) => {
                headers.remove(&API_KEY_HEADER);
                headers.insert(AUTHORIZATION, token.bearer_header());
            }
            Credential::ApiKey(key) => {
                headers.remove(AUTHORIZATION);
                headers.insert(API_KEY_HEADER, key.header_value());
            }
            Credential::Anonymous => {}
        }
        headers
    }
}

/// Session token first, then the static API key, then nothing.
#[derive(Clone)]
pub struct AuthStrategy {
    session: Arc<SessionController>,
    api_key: Option<StaticCredential>,
}

impl AuthStrategy {
    pub fn new(session: Arc<SessionController>, api_key: Option<StaticCredential>) -> Self {
        Self { session, api_key }
    }

    pub fn select(&self, snapshot: &SessionSnapshot) -> Credential {
        if let Some(ref token) = snapshot.token {
            Credential::Bearer(token.clone())
        } else if let Some(ref key) = self.api_key {
            Credential::ApiKey(key.clone())
        } else {
            Credential::Anonymous
        }
    }

    /// Credential that applies right now
    pub fn current(&self) -> Credential {
        self.select(&self.session.snapshot())
    }

    /// Merge the current credential over `caller_headers`.
    pub fn resolve_headers(&self, caller_headers: HeaderMap) -> HeaderMap {
        let credential = self.current();
        debug!(mode = credential.mode(), "Resolved request credential");
        credential.apply(caller_headers)
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, CONTENT_TYPE};

    use super::*;
    use crate::auth::MemoryCredentialStore;

    fn strategy(api_key: Option<&str>) -> AuthStrategy {
        let session = SessionController::new(Box::new(MemoryCredentialStore::new())).unwrap();
        AuthStrategy::new(
            Arc::new(session),
            api_key.map(|k| StaticCredential::parse(k).unwrap()),
        )
    }

    fn caller_headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_token_wins_over_static_key() {
        let strategy = strategy(Some("company-key"));
        strategy.session().login(SessionToken::parse("abc123").unwrap()).unwrap();

        let headers = strategy.resolve_headers(HeaderMap::new());
        assert_eq!(headers[AUTHORIZATION], "Bearer abc123");
        assert!(!headers.contains_key(&API_KEY_HEADER));
    }

    #[test]
    fn test_static_key_without_session() {
        let strategy = strategy(Some("company-key"));
        let headers = strategy.resolve_headers(HeaderMap::new());
        assert_eq!(headers[&API_KEY_HEADER], "company-key");
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_no_credential_passes_headers_through() {
        let strategy = strategy(None);
        assert!(strategy.resolve_headers(HeaderMap::new()).is_empty());

        let headers = caller_headers(&[("content-type", "application/json"), ("x-api-key", "callers")]);
        assert_eq!(strategy.resolve_headers(headers.clone()), headers);
    }

    #[test]
    fn test_caller_cannot_override_bearer() {
        let strategy = strategy(Some("company-key"));
        strategy.session().login(SessionToken::parse("abc123").unwrap()).unwrap();

        let headers = strategy
            .resolve_headers(caller_headers(&[
                ("authorization", "Bearer forged"),
                ("x-api-key", "other-company"),
                ("content-type", "application/json"),
            ]));

        assert_eq!(headers[AUTHORIZATION], "Bearer abc123");
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert!(!headers.contains_key(&API_KEY_HEADER));
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_caller_cannot_override_static_key() {
        let strategy = strategy(Some("company-key"));
        let headers = strategy
            .resolve_headers(caller_headers(&[
                ("x-api-key", "other-company"),
                ("authorization", "Bearer forged"),
            ]));

        assert_eq!(headers[&API_KEY_HEADER], "company-key");
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_logout_falls_back_to_static_key() {
        let strategy = strategy(Some("company-key"));
        strategy.session().login(SessionToken::parse("abc123").unwrap()).unwrap();
        strategy.session().logout().unwrap();

        assert_eq!(strategy.current().mode(), "api-key");
    }
}

//! Request gateway: every outbound API call goes through here.
//!
//! The gateway resolves the URL, lays the selected credential over the
//! caller's headers, sends, and returns whatever HTTP response came back. A
//! 401 is also handled here, globally: the session that issued the request is
//! torn down before the response reaches the caller, so a rejected token is
//! never sent twice.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, error, warn};

use super::transport::{ApiResponse, HttpTransport, OutboundRequest, Transport};
use super::{GatewayError, RequestDescriptor};
use crate::auth::{AuthStrategy, SessionController, StaticCredential};

/// Versioned prefix of every API path
pub const API_PREFIX: &str = "/api/v1";

#[derive(Clone)]
pub struct Gateway {
    base_url: Url,
    strategy: AuthStrategy,
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new(base_url: Url, strategy: AuthStrategy, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            strategy,
            transport,
        }
    }

    /// Gateway over reqwest with the given request timeout
    pub fn http(
        base_url: Url,
        session: Arc<SessionController>,
        api_key: Option<StaticCredential>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(timeout)?;
        Ok(Self::new(
            base_url,
            AuthStrategy::new(session, api_key),
            Arc::new(transport),
        ))
    }

    /// Absolute URL for an API path.
    ///
    /// A single leading slash on `path` is optional. The result must stay on
    /// the configured origin and under [`API_PREFIX`]. Anything after `?` or
    /// `#` is passed along untouched.
    pub fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        let target = path
            .split_once(|c| c == '?' || c == '#')
            .map_or(path, |(target, _)| target);
        if target.contains("://") || target.starts_with("//") {
            return Err(GatewayError::InvalidPath(path.to_string()));
        }

        let raw = format!(
            "{}{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            API_PREFIX,
            path.trim_start_matches('/')
        );
        let url = Url::parse(&raw).map_err(|_| GatewayError::InvalidPath(path.to_string()))?;

        let prefix = format!("{}{}/", self.base_url.path().trim_end_matches('/'), API_PREFIX);
        if url.origin() != self.base_url.origin() || !url.path().starts_with(&prefix) {
            return Err(GatewayError::InvalidPath(path.to_string()));
        }
        Ok(url)
    }

    /// Send `descriptor` under the current credential.
    ///
    /// Returns the response for every HTTP status. On 401 the issuing session
    /// is ended and login-required listeners have run by the time this
    /// returns; the 401 response is still handed back to the caller.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, GatewayError> {
        let url = self.endpoint(&descriptor.path)?;
        let snapshot = self.strategy.session().snapshot();
        let credential = self.strategy.select(&snapshot);

        debug!(
            method = %descriptor.method,
            path = %url.path(),
            mode = credential.mode(),
            "Sending API request"
        );

        let request = OutboundRequest {
            method: descriptor.method,
            url,
            headers: credential.apply(descriptor.headers),
            body: descriptor.body,
        };

        let response = self.transport.send(request).await?;

        if response.is_unauthorized() {
            warn!(path = %descriptor.path, mode = credential.mode(), "Request unauthorized, ending session");
            // The session is gone from memory either way; the caller still gets the 401
            if let Err(e) = self.strategy.session().handle_unauthorized(snapshot.epoch) {
                error!(error = %e, "Failed to remove rejected session from storage");
            }
        }

        Ok(response)
    }

    /// Send `descriptor` with the caller's headers only.
    ///
    /// No credential is attached and a 401 is just a response. Used for the
    /// login and registration endpoints, where a rejection means bad input
    /// rather than a dead session.
    pub async fn send_public(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, GatewayError> {
        let url = self.endpoint(&descriptor.path)?;
        debug!(method = %descriptor.method, path = %url.path(), "Sending public API request");

        let request = OutboundRequest {
            method: descriptor.method,
            url,
            headers: descriptor.headers,
            body: descriptor.body,
        };
        Ok(self.transport.send(request).await?)
    }

    pub fn session(&self) -> &Arc<SessionController> {
        self.strategy.session()
    }

    pub fn strategy(&self) -> &AuthStrategy {
        &self.strategy
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

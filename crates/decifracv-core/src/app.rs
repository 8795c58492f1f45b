//! Composition root.
//!
//! Owns the one `SessionController` and hands it by reference to the gateway
//! and the route guard, so there is a single writer of session state and no
//! global.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{ApiClient, Gateway, Transport};
use crate::auth::{AuthStrategy, CredentialStore, RouteGuard, SessionController};
use crate::config::Config;

pub struct App {
    pub config: Config,
    pub session: Arc<SessionController>,
    pub gateway: Arc<Gateway>,
    pub api: ApiClient,
    pub guard: RouteGuard,
}

impl App {
    /// Build the client from configuration, loading any persisted session
    pub fn new(config: Config) -> Result<Self> {
        let store = config.open_store().context("Failed to open session storage")?;
        let session = Arc::new(SessionController::new(store).context("Failed to load session")?);

        let gateway = Gateway::http(
            config.base_url()?,
            session.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        )
        .context("Failed to create HTTP client")?;

        Ok(Self::assemble(config, session, gateway))
    }

    /// Build the client over a caller-supplied store and transport
    pub fn with_parts(
        config: Config,
        store: Box<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let session = Arc::new(SessionController::new(store)?);
        let strategy = AuthStrategy::new(session.clone(), config.api_key.clone());
        let gateway = Gateway::new(config.base_url()?, strategy, transport);
        Ok(Self::assemble(config, session, gateway))
    }

    fn assemble(config: Config, session: Arc<SessionController>, gateway: Gateway) -> Self {
        debug!(
            base_url = %gateway.base_url(),
            store = session.backend(),
            api_key = config.api_key.is_some(),
            "Client assembled"
        );
        let gateway = Arc::new(gateway);
        let guard = RouteGuard::new(session.subscribe());
        Self {
            config,
            api: ApiClient::new(gateway.clone()),
            session,
            gateway,
            guard,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }
}

//! Route guard: decides whether protected content may render.

use tokio::sync::watch;

use super::session::AuthState;

/// Login entry point that redirects point to
pub const LOGIN_PATH: &str = "/login";

/// Application views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Upload,
    Docs,
    History,
    Metrics,
    RegisterCompany,
    RegisterUser,
    Companies,
    Users,
    Login,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Upload => "/",
            Route::Docs => "/docs",
            Route::History => "/history",
            Route::Metrics => "/metrics",
            Route::RegisterCompany => "/register",
            Route::RegisterUser => "/register-user",
            Route::Companies => "/companies",
            Route::Users => "/users",
            Route::Login => LOGIN_PATH,
        }
    }

    /// Views backed by user-scoped data need a session; the company-key
    /// flows (upload, registration) and docs do not.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::History | Route::Metrics | Route::Companies | Route::Users
        )
    }
}

/// Outcome of guarding a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    Rendered(T),
    Redirect { to: &'static str },
}

/// Gates protected views on the published [`AuthState`].
///
/// Holds no state of its own beyond a receiver of the session's published
/// state.
#[derive(Clone)]
pub struct RouteGuard {
    state: watch::Receiver<AuthState>,
}

impl RouteGuard {
    pub fn new(state: watch::Receiver<AuthState>) -> Self {
        Self { state }
    }

    /// Render `protected` only for an authenticated session.
    ///
    /// The closure is not invoked at all when anonymous.
    pub fn guard<T, F>(&self, protected: F) -> Guarded<T>
    where
        F: FnOnce() -> T,
    {
        if self.state.borrow().is_authenticated {
            Guarded::Rendered(protected())
        } else {
            Guarded::Redirect { to: LOGIN_PATH }
        }
    }

    /// Render `view` for `route`, guarding it when the route needs a session
    pub fn guard_route<T, F>(&self, route: Route, view: F) -> Guarded<T>
    where
        F: FnOnce() -> T,
    {
        if route.requires_auth() {
            self.guard(view)
        } else {
            Guarded::Rendered(view())
        }
    }
}

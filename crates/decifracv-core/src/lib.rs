//! DecifraCV client core.
//!
//! Everything needed to talk to the resume-parsing API on behalf of either a
//! logged-in user or a company integration:
//!
//! - [`auth`]: credential stores, session controller, credential selection, route guard
//! - [`api`]: request gateway, transport, typed client
//! - [`config`]: start-up configuration
//! - [`app`]: wires the pieces together from a [`config::Config`]

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;

pub use app::App;
pub use config::Config;

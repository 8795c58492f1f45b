//! REST API access for the DecifraCV backend.
//!
//! This module provides the `Gateway`, which every outbound call goes
//! through, and the typed `ApiClient` built on top of it.
//!
//! Requests carry either a user's bearer token or the company API key, never
//! both. See [`crate::auth`] for how the credential is chosen.

pub mod client;
pub mod error;
pub mod gateway;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ApiClient;
pub use error::{ApiError, GatewayError};
pub use gateway::{Gateway, API_PREFIX};
pub use request::{FilePart, RequestBody, RequestDescriptor, RequestOptions};
pub use transport::{ApiResponse, HttpTransport, OutboundRequest, Transport, TransportError};

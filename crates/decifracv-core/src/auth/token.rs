//! Validated credential values.
//!
//! Both credential kinds are opaque strings, but they end up verbatim in HTTP
//! headers, so they are checked once at the boundary and carried as newtypes
//! afterwards.

use std::fmt;

use reqwest::header::HeaderValue;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("{0} contains whitespace or non-printable characters")]
    InvalidCharacters(&'static str),
}

/// Accepts visible ASCII only, which is always a valid header value.
fn validate(kind: &'static str, raw: &str) -> Result<String, TokenError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TokenError::Empty(kind));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(TokenError::InvalidCharacters(kind));
    }
    Ok(trimmed.to_string())
}

fn sensitive_header(value: String) -> HeaderValue {
    // Visible ASCII was enforced at construction.
    let mut header = HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""));
    header.set_sensitive(true);
    header
}

/// Bearer token issued by the backend at login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        validate("session token", raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value for this token
    pub fn bearer_header(&self) -> HeaderValue {
        sensitive_header(format!("Bearer {}", self.0))
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Company-level API key configured out of band.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        validate("API key", raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `x-api-key` header value for this key
    pub fn header_value(&self) -> HeaderValue {
        sensitive_header(self.0.clone())
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticCredential(<redacted>)")
    }
}

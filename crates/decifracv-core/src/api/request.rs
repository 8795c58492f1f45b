//! Request descriptors accepted by the gateway.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Deserialize;

use super::GatewayError;

/// One file in a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Request payload, handed to the transport as-is.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    Bytes {
        content_type: Option<String>,
        data: Vec<u8>,
    },
    Multipart(Vec<FilePart>),
}

/// A single API call: path relative to the versioned API root, method,
/// caller headers and body.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Parse a descriptor from its JSON form, see [`RequestOptions`]
    pub fn from_json(raw: &str) -> Result<Self, GatewayError> {
        let options: RequestOptions =
            serde_json::from_str(raw).map_err(|e| GatewayError::InvalidOptions(e.to_string()))?;
        options.try_into()
    }
}

/// Serialized request options.
///
/// Only `path`, `method`, `headers` and `body` are recognized; anything else
/// is rejected instead of being silently ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestOptions {
    pub path: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl TryFrom<RequestOptions> for RequestDescriptor {
    type Error = GatewayError;

    fn try_from(options: RequestOptions) -> Result<Self, Self::Error> {
        let method = match options.method {
            Some(ref m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|_| GatewayError::InvalidOptions(format!("unknown method '{}'", m)))?,
            None => Method::GET,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| GatewayError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| GatewayError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        let body = match options.body {
            Some(value) => RequestBody::Json(value),
            None => RequestBody::Empty,
        };

        Ok(Self {
            path: options.path,
            method,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_options() {
        let descriptor = RequestDescriptor::from_json(
            r#"{
                "path": "/user/7/password",
                "method": "put",
                "headers": {"Content-Type": "application/json"},
                "body": {"new_password": "hunter22"}
            }"#,
        )
        .unwrap();

        assert_eq!(descriptor.path, "/user/7/password");
        assert_eq!(descriptor.method, Method::PUT);
        assert_eq!(descriptor.headers["content-type"], "application/json");
        assert_eq!(
            descriptor.body,
            RequestBody::Json(serde_json::json!({"new_password": "hunter22"}))
        );
    }

    #[test]
    fn test_defaults_to_get_without_body() {
        let descriptor = RequestDescriptor::from_json(r#"{"path": "/history"}"#).unwrap();
        assert_eq!(descriptor.method, Method::GET);
        assert!(descriptor.headers.is_empty());
        assert_eq!(descriptor.body, RequestBody::Empty);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = RequestDescriptor::from_json(r#"{"path": "/history", "credentials": "include"}"#)
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidOptions(_)));

        let err = RequestDescriptor::from_json(r#"{"method": "GET"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidOptions(_)));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let err = RequestDescriptor::from_json(r#"{"path": "/x", "headers": {"bad name": "v"}}"#)
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidHeader(_)));

        let err = RequestDescriptor::from_json(r#"{"path": "/x", "headers": {"x-note": "line\nbreak"}}"#)
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidHeader(_)));
    }

    #[test]
    fn test_invalid_method_rejected() {
        let err = RequestDescriptor::from_json(r#"{"path": "/x", "method": "GE T"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidOptions(_)));
    }
}

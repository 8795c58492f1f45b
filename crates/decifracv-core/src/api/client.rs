//! Typed client for the DecifraCV REST API.
//!
//! Thin wrappers over the [`Gateway`]: each method builds a descriptor,
//! interprets the status and decodes the body. Authorization failures have
//! already been handled by the gateway by the time a method sees them.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use super::gateway::Gateway;
use super::request::{FilePart, RequestBody, RequestDescriptor};
use super::transport::ApiResponse;
use super::ApiError;
use crate::auth::{SessionToken, StaticCredential, API_KEY_HEADER};
use crate::models::{
    Company, CompanyRegistration, LoginResponse, NewUser, ParsedResume, ResumeQuery,
    ResumeSearchPage, ResumeSummary, User,
};

/// Maximum number of retries for rate-limited (429) reads.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(serde::Deserialize)]
struct ParseEnvelope {
    #[serde(default)]
    data: ParsedResume,
}

#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<Gateway>,
    initial_backoff: Duration,
}

impl ApiClient {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    fn check(response: ApiResponse) -> Result<ApiResponse, ApiError> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status(), &response.text()))
        }
    }

    fn parse<T: DeserializeOwned>(response: &ApiResponse, path: &str) -> Result<T, ApiError> {
        response
            .json()
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }

    /// GET with exponential backoff on 429. Reads are safe to repeat.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self.gateway.request(RequestDescriptor::get(path)).await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                let response = Self::check(response)?;
                return Self::parse(&response, path);
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(path, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    async fn send<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError> {
        let path = descriptor.path.clone();
        let response = Self::check(self.gateway.request(descriptor).await?)?;
        Self::parse(&response, &path)
    }

    async fn send_empty(&self, descriptor: RequestDescriptor) -> Result<(), ApiError> {
        Self::check(self.gateway.request(descriptor).await?)?;
        Ok(())
    }

    // ===== Authentication =====

    /// Exchange email and password for a session token and start the session
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let descriptor = RequestDescriptor::post("/auth/login")
            .json(json!({ "email": email, "password": password }));
        let response = self.gateway.send_public(descriptor).await?;

        if !response.is_success() {
            let detail = ApiError::detail(&response.text());
            debug!(status = %response.status(), "Login rejected");
            return Err(ApiError::AuthenticationFailed(detail));
        }

        let login: LoginResponse = Self::parse(&response, "/auth/login")?;
        let token = SessionToken::parse(&login.access_token)?;
        self.gateway.session().login(token)?;
        info!("Login successful");
        Ok(())
    }

    /// Register a user under the company identified by `company_key`
    pub async fn register_user(
        &self,
        company_key: &StaticCredential,
        user: &NewUser,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_value(user)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let descriptor = RequestDescriptor::post("/auth/register")
            .header(API_KEY_HEADER, company_key.header_value())
            .json(body);
        Self::check(self.gateway.send_public(descriptor).await?)?;
        info!("User registered");
        Ok(())
    }

    /// Register a company; the response carries its new API key
    pub async fn register_company(&self, name: &str, email: &str) -> Result<CompanyRegistration, ApiError> {
        let descriptor = RequestDescriptor::post("/companies/register")
            .json(json!({ "name": name, "email": email }));
        self.send(descriptor).await
    }

    // ===== Resumes =====

    pub async fn history(&self) -> Result<Vec<ResumeSummary>, ApiError> {
        self.get("/history").await
    }

    pub async fn search_resumes(&self, query: &ResumeQuery) -> Result<ResumeSearchPage, ApiError> {
        self.get(&format!("/resumes/search?{}", query.to_query_string()))
            .await
    }

    pub async fn delete_resume(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(RequestDescriptor::delete(format!("/delete/{}", id)))
            .await
    }

    /// Upload a resume file for parsing
    pub async fn parse_resume(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> Result<ParsedResume, ApiError> {
        let part = FilePart {
            field: "file".to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.map(str::to_string),
            data,
        };
        let descriptor = RequestDescriptor::post("/parse").body(RequestBody::Multipart(vec![part]));
        let envelope: ParseEnvelope = self.send(descriptor).await?;
        Ok(envelope.data)
    }

    // ===== Companies and users =====

    pub async fn companies(&self) -> Result<Vec<Company>, ApiError> {
        self.get("/companies").await
    }

    pub async fn delete_company(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(RequestDescriptor::delete(format!("/companies/{}", id)))
            .await
    }

    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.get("/user/list").await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(RequestDescriptor::delete(format!("/user/{}", id)))
            .await
    }

    pub async fn change_password(&self, id: i64, new_password: &str) -> Result<(), ApiError> {
        let descriptor = RequestDescriptor::put(format!("/user/{}/password", id))
            .json(json!({ "new_password": new_password }));
        self.send_empty(descriptor).await
    }
}

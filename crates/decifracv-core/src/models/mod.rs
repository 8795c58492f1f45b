//! Data models for DecifraCV API entities.
//!
//! - `Company`, `CompanyRegistration`: company accounts and their API keys
//! - `User`, `NewUser`: user accounts scoped to a company
//! - `ResumeSummary`, `ResumeQuery`, `ResumeSearchPage`, `ParsedResume`:
//!   parsed resume history and search

pub mod account;
pub mod resume;

pub use account::{Company, CompanyRegistration, LoginResponse, NewUser, User};
pub use resume::{Pagination, ParsedResume, ResumeQuery, ResumeSearchPage, ResumeSummary};

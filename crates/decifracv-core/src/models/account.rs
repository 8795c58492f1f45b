use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Company {
    /// API key with all but the last four characters masked
    pub fn masked_api_key(&self) -> String {
        let Some(ref key) = self.api_key else {
            return "-".to_string();
        };
        let len = key.chars().count();
        if len <= 4 {
            return "****".to_string();
        }
        let visible: String = key.chars().skip(len - 4).collect();
        format!("{}{}", "*".repeat(len - 4), visible)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyRegistration {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company_id: Option<i64>,
}

/// Payload for `POST /auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_api_key() {
        let mut company: Company = serde_json::from_str(
            r#"{"id": 1, "name": "Mux Tech", "email": "contato@mux.com", "api_key": "421406e01293a635", "created_at": "2025-10-01T12:00:00"}"#,
        )
        .unwrap();
        assert_eq!(company.masked_api_key(), "************a635");

        company.api_key = Some("abc".to_string());
        assert_eq!(company.masked_api_key(), "****");

        company.api_key = None;
        assert_eq!(company.masked_api_key(), "-");
    }

    #[test]
    fn test_user_without_company() {
        let user: User = serde_json::from_str(r#"{"id": 7, "name": "Ana", "email": "ana@mux.com"}"#).unwrap();
        assert_eq!(user.id, 7);
        assert!(user.company_id.is_none());
    }
}

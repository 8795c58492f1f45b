use serde::{Deserialize, Serialize};

/// Default page size used by the history view
const DEFAULT_PAGE_SIZE: u32 = 10;

/// One processed resume as listed by history and search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeSummary {
    pub id: i64,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub cost_brl: Option<f64>,
    #[serde(default)]
    pub processing_ms: Option<i64>,
    /// Extracted fields; shape is owned by the parser service
    #[serde(default)]
    pub data_json: Option<serde_json::Value>,
}

impl ResumeSummary {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.file_name.as_deref())
            .unwrap_or("(unnamed)")
    }

    /// Confidence as a percentage string, e.g. "87%"
    pub fn confidence_display(&self) -> String {
        match self.confidence {
            Some(c) if c <= 1.0 => format!("{:.0}%", c * 100.0),
            Some(c) => format!("{:.0}%", c),
            None => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeSearchPage {
    #[serde(default)]
    pub data: Vec<ResumeSummary>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl ResumeSearchPage {
    pub fn total_pages(&self) -> u32 {
        self.pagination
            .as_ref()
            .and_then(|p| p.total_pages)
            .unwrap_or(1)
    }
}

/// Filters for `GET /resumes/search`. Empty filters are left out of the query.
#[derive(Debug, Clone)]
pub struct ResumeQuery {
    pub page: u32,
    pub page_size: u32,
    pub skills: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub city: Option<String>,
    pub confidence_min: Option<f64>,
}

impl Default for ResumeQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            skills: None,
            title: None,
            company: None,
            city: None,
            confidence_min: None,
        }
    }
}

impl ResumeQuery {
    pub fn to_query_string(&self) -> String {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        let filters = [
            ("skills", &self.skills),
            ("title", &self.title),
            ("company", &self.company),
            ("city", &self.city),
        ];
        for (name, value) in filters {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((name, v.to_string()));
            }
        }
        if let Some(min) = self.confidence_min {
            pairs.push(("confidence_min", min.to_string()));
        }

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Result of `POST /parse`, the `data` member of the response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedResume {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One row of the persisted dataset, keyed by `profile_url`.
///
/// Field names map onto the fixed `Profile_URL,Description,Company` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(rename = "Profile_URL")]
    pub profile_url: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Company", default)]
    pub company: String,
}

impl ProfileRecord {
    pub fn new(
        profile_url: impl Into<String>,
        description: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            profile_url: profile_url.into(),
            description: description.into(),
            company: company.into(),
        }
    }
}

/// A profile row as seen on a listing page, before company attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedProfile {
    pub url: String,
    pub description: String,
}

/// A row of the input company list.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyRow {
    #[serde(rename = "Name")]
    pub name: String,
}

/// A browser cookie as stored in the session credential file.
///
/// Compatible with the cookie arrays exported by browser tooling; fields
/// such as `sameSite`, `storeId` or `id` are ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiry as seconds since the Unix epoch; absent for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
}

/// Tallies produced by merging one batch into the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Keys inserted.
    pub new: usize,
    /// Existing keys where at least one field changed.
    pub updated: usize,
    /// Batch entries that changed nothing.
    pub skipped: usize,
}

impl MergeStats {
    pub fn absorb(&mut self, other: MergeStats) {
        self.new += other.new;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

/// Outcome of one harvest run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub companies_processed: usize,
    pub companies_failed: usize,
    pub pages_visited: usize,
    pub pages_failed: usize,
    pub totals: MergeStats,
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            companies_processed: 0,
            companies_failed: 0,
            pages_visited: 0,
            pages_failed: 0,
            totals: MergeStats::default(),
            interrupted: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Normalize a profile address into a dataset key.
///
/// Strips the query string and fragment. Returns `None` for anything that
/// is not an absolute http(s) URL.
pub fn normalize_profile_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

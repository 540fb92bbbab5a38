use std::time::Duration;

use url::Url;

use crate::dataset::CompletenessPolicy;
use crate::error::AppError;

/// Default site root.
pub const DEFAULT_SITE_URL: &str = "https://www.linkedin.com";

/// Routes of the networking site the harvest runs against.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    root: Url,
}

impl SiteConfig {
    pub fn new(root: &str) -> Result<Self, AppError> {
        let root = Url::parse(root)
            .map_err(|e| AppError::Config(format!("Invalid site URL '{root}': {e}")))?;
        if !matches!(root.scheme(), "http" | "https") || root.host_str().is_none() {
            return Err(AppError::Config(format!(
                "Site URL must be an http(s) address with a host, got '{root}'"
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &str {
        self.root.as_str()
    }

    pub fn host(&self) -> &str {
        self.root.host_str().unwrap_or_default()
    }

    pub fn login_url(&self) -> String {
        self.endpoint("/login").to_string()
    }

    /// Company search results for `name`.
    pub fn company_search_url(&self, name: &str) -> String {
        let mut url = self.endpoint("/search/results/companies/");
        url.query_pairs_mut().append_pair("keywords", name);
        url.to_string()
    }

    /// People listing of a normalized company page address.
    pub fn people_url(&self, company_url: &str) -> String {
        format!("{}/people/", company_url.trim_end_matches('/'))
    }

    /// Reduce a company link to its bare page address.
    ///
    /// Drops the query string and any trailing `/people` or `/about` section.
    /// Returns `None` for links that are not company pages on this site.
    pub fn normalize_company_url(&self, href: &str) -> Option<String> {
        let mut url = self.root.join(href.trim()).ok()?;
        if url.host_str() != self.root.host_str() || !url.path().contains("/company/") {
            return None;
        }
        url.set_query(None);
        url.set_fragment(None);

        let path = url.path().trim_end_matches('/');
        let path = path
            .strip_suffix("/people")
            .or_else(|| path.strip_suffix("/about"))
            .unwrap_or(path)
            .to_string();
        url.set_path(&path);
        Some(url.to_string())
    }

    /// True if `url` is one of the site's people listings.
    pub fn is_people_listing(&self, url: &str) -> bool {
        url.contains("/search/results/people/") || url.contains("/people/")
    }

    /// True if `url` is on this site and not on the login page.
    pub fn is_signed_in_address(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(u) => {
                let host = self.host();
                let on_site = u
                    .host_str()
                    .is_some_and(|h| h == host || h.ends_with(&format!(".{host}")));
                on_site && !u.path().starts_with("/login")
            }
            Err(_) => false,
        }
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.root.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }
}

/// Timeouts, pacing and limits for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub site: SiteConfig,
    /// How long to wait for a listing element to appear.
    pub element_timeout: Duration,
    /// How long to wait for a page to render after navigation.
    pub page_load_timeout: Duration,
    /// Minimum spacing between navigations.
    pub action_delay: Duration,
    /// Pause between two companies.
    pub company_delay: Duration,
    pub max_profiles_per_company: usize,
    pub max_pages: Option<usize>,
    pub completeness: CompletenessPolicy,
    /// In update mode, drop rows whose stored record is already complete.
    pub skip_complete: bool,
}

impl HarvestConfig {
    /// Defaults for everything but the site.
    pub fn new(site: SiteConfig) -> Self {
        Self {
            site,
            element_timeout: Duration::from_secs(10),
            page_load_timeout: Duration::from_secs(30),
            action_delay: Duration::from_secs(3),
            company_delay: Duration::from_secs(7),
            max_profiles_per_company: 1000,
            max_pages: None,
            completeness: CompletenessPolicy::default(),
            skip_complete: true,
        }
    }
}

/// Session acquisition settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum time to wait for an interactive login.
    pub login_timeout: Duration,
    pub poll_interval: Duration,
    /// How long to wait for the signed-in marker after restoring cookies.
    pub verify_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
            verify_timeout: Duration::from_secs(10),
        }
    }
}

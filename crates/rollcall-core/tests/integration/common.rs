use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rollcall_core::config::{DEFAULT_SITE_URL, HarvestConfig, SiteConfig};
use rollcall_core::error::AppError;
use rollcall_core::models::{ProfileRecord, ScrapedProfile, SessionCookie};
use rollcall_core::pagination::PaginationControl;
use rollcall_core::traits::{PageSource, Target};

pub fn rec(url: &str, description: &str, company: &str) -> ProfileRecord {
    ProfileRecord::new(url, description, company)
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// Harvest settings with every wait and pause disabled.
pub fn instant_config() -> HarvestConfig {
    let mut config = HarvestConfig::new(SiteConfig::new(DEFAULT_SITE_URL).unwrap());
    config.element_timeout = Duration::ZERO;
    config.page_load_timeout = Duration::ZERO;
    config.action_delay = Duration::ZERO;
    config.company_delay = Duration::ZERO;
    config
}

/// One listing page: its profile rows and pagination labels.
#[derive(Default, Clone)]
pub struct ListingPage {
    pub profiles: Vec<(String, String)>,
    pub labels: Vec<String>,
}

/// A tiny in-memory site: each company has a people listing whose pages are
/// addressed with `&page=N`.
#[derive(Default)]
pub struct FakeSite {
    listings: HashMap<String, Vec<ListingPage>>,
    current: Mutex<String>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `company` (slug) with one entry per page.
    pub fn company(mut self, slug: &str, pages: Vec<Vec<(&str, &str)>>) -> Self {
        let labels: Vec<String> = if pages.len() > 1 {
            (1..=pages.len()).map(|n| n.to_string()).collect()
        } else {
            Vec::new()
        };
        let pages = pages
            .into_iter()
            .map(|rows| ListingPage {
                profiles: rows
                    .into_iter()
                    .map(|(profile, desc)| {
                        (format!("https://www.linkedin.com/in/{profile}"), desc.to_string())
                    })
                    .collect(),
                labels: labels.clone(),
            })
            .collect();
        self.listings.insert(slug.to_string(), pages);
        self
    }

    fn listing_address(slug: &str) -> String {
        format!("https://www.linkedin.com/search/results/people/?company={slug}")
    }

    /// (company slug, page index) of the current address, if it is a listing.
    fn location(&self) -> Option<(String, usize)> {
        let current = self.current.lock().unwrap().clone();
        let url = url::Url::parse(&current).ok()?;
        if !url.path().starts_with("/search/results/people/") {
            return None;
        }
        let mut slug = None;
        let mut page = 1;
        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                "company" => slug = Some(v.into_owned()),
                "page" => page = v.parse().ok()?,
                _ => {}
            }
        }
        Some((slug?, page.max(1) - 1))
    }

    fn page(&self) -> Option<ListingPage> {
        let (slug, index) = self.location()?;
        self.listings.get(&slug)?.get(index).cloned()
    }

    fn searched_slug(&self) -> Option<String> {
        let current = self.current.lock().unwrap().clone();
        let url = url::Url::parse(&current).ok()?;
        if url.path() != "/search/results/companies/" {
            return None;
        }
        let keywords = url
            .query_pairs()
            .find(|(k, _)| k == "keywords")
            .map(|(_, v)| v.to_lowercase().replace(' ', "-"))?;
        self.listings.contains_key(&keywords).then_some(keywords)
    }
}

impl PageSource for FakeSite {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        let mut current = self.current.lock().unwrap();
        *current = match url
            .strip_prefix("https://www.linkedin.com/company/")
            .and_then(|rest| rest.strip_suffix("/people/"))
        {
            Some(slug) => Self::listing_address(slug),
            None => url.to_string(),
        };
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AppError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn wait_for(&self, target: Target, _timeout: Duration) -> Result<bool, AppError> {
        Ok(match target {
            Target::Body | Target::LoginIndicator => true,
            Target::CompanyResults => self.searched_slug().is_some(),
            Target::PaginationList => self.page().is_some_and(|p| !p.labels.is_empty()),
            Target::ProfileList => self.page().is_some(),
            Target::ResultCount => false,
        })
    }

    async fn pagination_controls(&self) -> Result<Vec<PaginationControl>, AppError> {
        Ok(self
            .page()
            .map(|p| p.labels.into_iter().map(PaginationControl::labelled).collect())
            .unwrap_or_default())
    }

    async fn links(&self, _target: Target) -> Result<Vec<String>, AppError> {
        Ok(self
            .searched_slug()
            .map(|slug| vec![format!("https://www.linkedin.com/company/{slug}/?trk=srp")])
            .unwrap_or_default())
    }

    async fn profile_entries(&self) -> Result<Vec<ScrapedProfile>, AppError> {
        Ok(self
            .page()
            .map(|p| {
                p.profiles
                    .into_iter()
                    .map(|(url, description)| ScrapedProfile { url, description })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn text_of(&self, _target: Target) -> Result<Option<String>, AppError> {
        Ok(None)
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, AppError> {
        Ok(Vec::new())
    }

    async fn set_cookies(&self, _cookies: Vec<SessionCookie>) -> Result<(), AppError> {
        Ok(())
    }
}

use rollcall_core::error::AppError;
use rollcall_core::traits::Target;
use scraper::Selector;
use serde::Deserialize;

/// CSS selectors for every page element the harvest reads.
///
/// The defaults follow the current markup of the site; a JSON file with any
/// subset of these fields can override them when the markup changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    pub body: String,
    pub company_results: String,
    pub pagination_list: String,
    /// Items inside the pagination list; one control each.
    pub pagination_item: String,
    pub profile_list: String,
    /// One row per profile inside the profile list.
    pub profile_row: String,
    /// Main profile link within a row.
    pub profile_link: String,
    /// Headline/summary text within a row, first non-empty match wins.
    pub profile_description: String,
    pub result_count: String,
    pub login_indicator: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            body: "body".into(),
            company_results: "a[href*='/company/']".into(),
            pagination_list: "ul.artdeco-pagination__pages, .artdeco-pagination ul".into(),
            pagination_item: "li".into(),
            profile_list: "ul.reusable-search__entity-result-list, \
                           div.search-results-container ul[role='list'], \
                           main ul[role='list']"
                .into(),
            profile_row: "li.reusable-search__result-container, div.entity-result, \
                          ul[role='list'] > li"
                .into(),
            profile_link: "a[href*='/in/']".into(),
            profile_description: ".entity-result__primary-subtitle, \
                                  .entity-result__summary, \
                                  div.t-14.t-black.t-normal"
                .into(),
            result_count: ".search-results-container h2, h2.pb2".into(),
            login_indicator: "input[placeholder*='Search'], input[aria-label*='Search'], \
                              input.search-global-typeahead__input, \
                              button[aria-label*='Me'], nav[aria-label*='Main']"
                .into(),
        }
    }
}

impl SiteSelectors {
    /// Read overrides from a JSON file; missing fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn compile(&self) -> Result<CompiledSelectors, AppError> {
        Ok(CompiledSelectors {
            body: parse("body", &self.body)?,
            company_results: parse("company_results", &self.company_results)?,
            pagination_list: parse("pagination_list", &self.pagination_list)?,
            pagination_item: parse("pagination_item", &self.pagination_item)?,
            profile_list: parse("profile_list", &self.profile_list)?,
            profile_row: parse("profile_row", &self.profile_row)?,
            profile_link: parse("profile_link", &self.profile_link)?,
            profile_description: parse("profile_description", &self.profile_description)?,
            result_count: parse("result_count", &self.result_count)?,
            login_indicator: parse("login_indicator", &self.login_indicator)?,
            anchor: parse("anchor", "a[href]")?,
            button: parse("button", "button")?,
        })
    }
}

fn parse(field: &str, css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::Config(format!("Invalid {field} selector '{css}': {e}")))
}

/// Parsed form of [`SiteSelectors`].
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub(crate) body: Selector,
    pub(crate) company_results: Selector,
    pub(crate) pagination_list: Selector,
    pub(crate) pagination_item: Selector,
    pub(crate) profile_list: Selector,
    pub(crate) profile_row: Selector,
    pub(crate) profile_link: Selector,
    pub(crate) profile_description: Selector,
    pub(crate) result_count: Selector,
    pub(crate) login_indicator: Selector,
    pub(crate) anchor: Selector,
    pub(crate) button: Selector,
}

impl CompiledSelectors {
    pub fn target(&self, target: Target) -> &Selector {
        match target {
            Target::Body => &self.body,
            Target::CompanyResults => &self.company_results,
            Target::PaginationList => &self.pagination_list,
            Target::ProfileList => &self.profile_list,
            Target::ResultCount => &self.result_count,
            Target::LoginIndicator => &self.login_indicator,
        }
    }
}

//! Enumeration of every page of a paginated listing.
//!
//! The listing exposes a handful of pagination controls: some carry a full
//! link, others only a page number label. [`PageEnumerator`] turns them into
//! an ordered, deduplicated [`PageSet`] of navigable addresses.

use std::collections::BTreeSet;

use url::Url;

/// Page number assigned to addresses with no readable page parameter.
/// Such pages sort after every numbered page.
pub const UNKNOWN_PAGE: u32 = 999;

/// Query parameter carrying the page number.
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// One candidate pagination control as read from the listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationControl {
    /// Navigable address, absolute or relative to the listing.
    pub href: Option<String>,
    /// Visible label, e.g. `"3"` or `"Next"`.
    pub label: Option<String>,
}

impl PaginationControl {
    pub fn link(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            label: None,
        }
    }

    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            href: None,
            label: Some(label.into()),
        }
    }
}

/// Ordered addresses of every page of one listing, visited front to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSet {
    pages: Vec<String>,
}

impl PageSet {
    pub fn single(address: impl Into<String>) -> Self {
        Self {
            pages: vec![address.into()],
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.pages
    }
}

impl IntoIterator for PageSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.into_iter()
    }
}

/// Builds [`PageSet`]s from pagination controls.
#[derive(Debug, Clone)]
pub struct PageEnumerator {
    page_param: String,
    max_pages: Option<usize>,
}

impl Default for PageEnumerator {
    fn default() -> Self {
        Self {
            page_param: DEFAULT_PAGE_PARAM.to_string(),
            max_pages: None,
        }
    }
}

impl PageEnumerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_param(mut self, param: impl Into<String>) -> Self {
        self.page_param = param.into();
        self
    }

    /// Keep at most `max` pages (the lowest-numbered ones).
    pub fn with_max_pages(mut self, max: Option<usize>) -> Self {
        self.max_pages = max;
        self
    }

    /// Enumerate every page of the listing currently at `current_url`.
    ///
    /// With no usable controls the listing is a single page and the result is
    /// `current_url` unchanged. Controls that yield neither a same-listing
    /// address nor a numeric label are skipped.
    pub fn enumerate(&self, current_url: &str, controls: &[PaginationControl]) -> PageSet {
        if controls.is_empty() {
            return PageSet::single(current_url);
        }

        let current = match Url::parse(current_url) {
            Ok(u) => u,
            Err(e) => {
                tracing::debug!(
                    url = %current_url,
                    error = %e,
                    "Listing address unparseable, treating as one page"
                );
                return PageSet::single(current_url);
            }
        };
        let base = self.base_address(&current);

        let mut unique = BTreeSet::new();
        for control in controls {
            match self.resolve(control, &current, &base) {
                Some(url) => {
                    unique.insert(canonical(&url));
                }
                None => tracing::debug!(?control, "Skipping unusable pagination control"),
            }
        }

        if unique.is_empty() {
            tracing::debug!(
                controls = controls.len(),
                "No usable pagination controls, treating as one page"
            );
            return PageSet::single(current_url);
        }

        let mut pages: Vec<(u32, String)> = unique
            .into_iter()
            .map(|address| (self.page_number(&address), address))
            .collect();
        // stable: equal page numbers keep their lexical order
        pages.sort_by_key(|(n, _)| *n);

        let mut pages: Vec<String> = pages.into_iter().map(|(_, address)| address).collect();
        if let Some(max) = self.max_pages {
            pages.truncate(max.max(1));
        }

        PageSet { pages }
    }

    /// The listing address with its page parameter and fragment removed.
    pub fn base_address(&self, url: &Url) -> Url {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != self.page_param.as_str())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut base = url.clone();
        base.set_fragment(None);
        base.set_query(None);
        if !kept.is_empty() {
            base.query_pairs_mut().extend_pairs(kept);
        }
        base
    }

    /// Page number carried by `address`, or [`UNKNOWN_PAGE`].
    pub fn page_number(&self, address: &str) -> u32 {
        Url::parse(address)
            .ok()
            .and_then(|u| {
                u.query_pairs()
                    .find(|(k, _)| k == self.page_param.as_str())
                    .and_then(|(_, v)| v.parse::<u32>().ok())
            })
            .unwrap_or(UNKNOWN_PAGE)
    }

    fn resolve(&self, control: &PaginationControl, current: &Url, base: &Url) -> Option<Url> {
        let explicit = control
            .href
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .and_then(|h| current.join(h).ok())
            .filter(|u| same_listing(u, base));
        if explicit.is_some() {
            return explicit;
        }

        let number = parse_page_label(control.label.as_deref()?)?;
        let mut url = base.clone();
        url.query_pairs_mut()
            .append_pair(&self.page_param, &number.to_string());
        Some(url)
    }
}

fn parse_page_label(label: &str) -> Option<u32> {
    let label = label.trim();
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    label.parse().ok()
}

fn same_listing(candidate: &Url, base: &Url) -> bool {
    matches!(candidate.scheme(), "http" | "https")
        && candidate.host_str() == base.host_str()
        && candidate.path().trim_end_matches('/') == base.path().trim_end_matches('/')
}

/// Canonical form used for deduplication: no fragment, query pairs sorted
/// by key.
fn canonical(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = url.clone();
    out.set_fragment(None);
    out.set_query(None);
    if !pairs.is_empty() {
        out.query_pairs_mut().extend_pairs(pairs);
    }
    out.to_string()
}

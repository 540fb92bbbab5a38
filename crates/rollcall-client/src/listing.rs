//! Extraction of listing data from rendered HTML.

use std::collections::HashSet;

use rollcall_core::models::{ScrapedProfile, normalize_profile_url};
use rollcall_core::pagination::PaginationControl;
use rollcall_core::traits::Target;
use scraper::{ElementRef, Html};
use url::Url;

use crate::selectors::CompiledSelectors;

/// Reads harvest targets out of a page snapshot.
#[derive(Debug, Clone)]
pub struct ListingParser {
    selectors: CompiledSelectors,
}

impl ListingParser {
    pub fn new(selectors: CompiledSelectors) -> Self {
        Self { selectors }
    }

    pub fn is_present(&self, html: &str, target: Target) -> bool {
        let doc = Html::parse_document(html);
        doc.select(self.selectors.target(target)).next().is_some()
    }

    /// One control per item of the first pagination list.
    pub fn pagination_controls(&self, html: &str) -> Vec<PaginationControl> {
        let doc = Html::parse_document(html);
        let Some(list) = doc.select(&self.selectors.pagination_list).next() else {
            return Vec::new();
        };

        list.select(&self.selectors.pagination_item)
            .map(|item| {
                let anchor = item.select(&self.selectors.anchor).next();
                let href = anchor
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string);
                let clickable = anchor.or_else(|| item.select(&self.selectors.button).next());
                let label = clickable
                    .map(control_label)
                    .filter(|l| !l.is_empty())
                    .or_else(|| Some(collapse_text(item)).filter(|l| !l.is_empty()));
                PaginationControl { href, label }
            })
            .collect()
    }

    /// Link addresses inside (or on) every element matching `target`.
    pub fn links(&self, html: &str, target: Target) -> Vec<String> {
        let doc = Html::parse_document(html);
        let mut out = Vec::new();
        for el in doc.select(self.selectors.target(target)) {
            if let Some(href) = el.value().attr("href") {
                out.push(href.to_string());
                continue;
            }
            out.extend(
                el.select(&self.selectors.anchor)
                    .filter_map(|a| a.value().attr("href"))
                    .map(str::to_string),
            );
        }
        out
    }

    /// Profile rows of the listing, deduplicated by normalized address.
    ///
    /// Relative links are resolved against `base`. Rows without a profile
    /// link are skipped; a row without a headline yields an empty description.
    pub fn profile_entries(&self, html: &str, base: &Url) -> Vec<ScrapedProfile> {
        let doc = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for list in doc.select(&self.selectors.profile_list) {
            for row in list.select(&self.selectors.profile_row) {
                let Some(url) = row
                    .select(&self.selectors.profile_link)
                    .filter_map(|a| a.value().attr("href"))
                    .find_map(|href| profile_address(href, base))
                else {
                    continue;
                };
                if !seen.insert(url.clone()) {
                    continue;
                }

                let description = row
                    .select(&self.selectors.profile_description)
                    .map(collapse_text)
                    .find(|t| !t.is_empty())
                    .unwrap_or_default();
                out.push(ScrapedProfile { url, description });
            }
        }

        tracing::debug!(profiles = out.len(), "Parsed listing rows");
        out
    }

    pub fn text_of(&self, html: &str, target: Target) -> Option<String> {
        let doc = Html::parse_document(html);
        doc.select(self.selectors.target(target))
            .map(collapse_text)
            .find(|t| !t.is_empty())
    }
}

fn profile_address(href: &str, base: &Url) -> Option<String> {
    let joined = base.join(href.trim()).ok()?;
    if !joined.path().contains("/in/") {
        return None;
    }
    normalize_profile_url(joined.as_str())
}

/// Visible label of a pagination control, falling back to the trailing
/// word of its `aria-label` ("Page 3").
fn control_label(el: ElementRef<'_>) -> String {
    let text = collapse_text(el);
    if !text.is_empty() {
        return text;
    }
    el.value()
        .attr("aria-label")
        .and_then(|a| a.split_whitespace().last())
        .unwrap_or_default()
        .to_string()
}

fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub mod browser_source;
pub mod listing;
pub mod selectors;

pub use browser_source::{BrowserOptions, BrowserPageSource};
pub use listing::ListingParser;
pub use selectors::{CompiledSelectors, SiteSelectors};

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{ScrapedProfile, SessionCookie};
use crate::pagination::PaginationControl;

/// Page elements the harvest logic waits for or reads.
///
/// Implementations map each target onto their own selectors; the core never
/// sees selector syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The document body; present once a page has rendered.
    Body,
    /// Result links on the company search page.
    CompanyResults,
    /// The pagination control list of a people listing.
    PaginationList,
    /// The container of profile rows on a people listing.
    ProfileList,
    /// The "N results" heading of a listing.
    ResultCount,
    /// Any element only shown to a signed-in user.
    LoginIndicator,
}

/// A single browser tab driven by the harvest loop.
///
/// Waits degrade to `Ok(false)` on timeout; errors are reserved for the
/// page source itself failing (navigation errors, a dead browser).
pub trait PageSource: Send + Sync {
    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Address of the current page, after redirects.
    fn current_url(&self) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Poll until `target` is present or `timeout` elapses. A zero timeout
    /// checks once.
    fn wait_for(
        &self,
        target: Target,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Pagination controls currently visible on the listing.
    fn pagination_controls(
        &self,
    ) -> impl Future<Output = Result<Vec<PaginationControl>, AppError>> + Send;

    /// Link addresses found inside `target`, in document order.
    fn links(&self, target: Target) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;

    /// Profile rows currently visible on the listing.
    fn profile_entries(&self)
    -> impl Future<Output = Result<Vec<ScrapedProfile>, AppError>> + Send;

    /// Trimmed text content of `target`, if present.
    fn text_of(&self, target: Target)
    -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    fn cookies(&self) -> impl Future<Output = Result<Vec<SessionCookie>, AppError>> + Send;

    fn set_cookies(
        &self,
        cookies: Vec<SessionCookie>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

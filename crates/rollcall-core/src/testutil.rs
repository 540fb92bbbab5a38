//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::dataset::Dataset;
use crate::error::AppError;
use crate::harvest::{HarvestEvent, HarvestReporter};
use crate::models::{ScrapedProfile, SessionCookie};
use crate::pagination::PaginationControl;
use crate::store::DatasetStore;
use crate::traits::{PageSource, Target};

const SIGNED_IN_ADDRESS: &str = "https://www.linkedin.com/feed/";

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

/// Scripted content of one address served by [`MockPageSource`].
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    present: HashSet<Target>,
    redirect: Option<String>,
    controls: Vec<PaginationControl>,
    links: HashMap<Target, Vec<String>>,
    profiles: Vec<ScrapedProfile>,
    texts: HashMap<Target, String>,
    failing: bool,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn present(mut self, targets: &[Target]) -> Self {
        self.present.extend(targets.iter().copied());
        self
    }

    /// Address reported by `current_url` after navigating here.
    pub fn redirect(mut self, url: &str) -> Self {
        self.redirect = Some(url.to_string());
        self
    }

    pub fn controls(mut self, controls: Vec<PaginationControl>) -> Self {
        self.controls = controls;
        self
    }

    pub fn links(mut self, target: Target, hrefs: &[&str]) -> Self {
        self.links
            .insert(target, hrefs.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn profiles(mut self, profiles: Vec<ScrapedProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn text(mut self, target: Target, text: &str) -> Self {
        self.texts.insert(target, text.to_string());
        self
    }

    /// Navigating here fails.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

// ---------------------------------------------------------------------------
// MockPageSource
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct BrowserState {
    page: Option<String>,
    current: String,
    visited: Vec<String>,
    cookies: Vec<SessionCookie>,
    logged_in: bool,
    pending_login: Option<(usize, Vec<SessionCookie>)>,
}

/// Scripted browser tab. Unknown addresses render as empty pages.
#[derive(Clone, Default)]
pub struct MockPageSource {
    pages: HashMap<String, MockPage>,
    session_cookie: Option<String>,
    state: Arc<Mutex<BrowserState>>,
}

impl MockPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` at `url`, replacing any earlier script for it.
    pub fn with_page(mut self, url: &str, page: MockPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Setting a cookie with this name signs the tab in.
    pub fn with_session_cookie(mut self, name: &str) -> Self {
        self.session_cookie = Some(name.to_string());
        self
    }

    /// Simulate a manual login completing on the `polls`-th `current_url`
    /// call; `cookies` become the tab's cookies.
    pub fn with_login_after(self, polls: usize, cookies: Vec<SessionCookie>) -> Self {
        self.state.lock().unwrap().pending_login = Some((polls.max(1), cookies));
        self
    }

    /// Every address passed to `navigate`, in order.
    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    fn with_current_page<T>(&self, f: impl FnOnce(Option<&MockPage>) -> T) -> T {
        let state = self.state.lock().unwrap();
        f(state.page.as_ref().and_then(|key| self.pages.get(key)))
    }
}

impl PageSource for MockPageSource {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.visited.push(url.to_string());

        let page = self.pages.get(url);
        if page.is_some_and(|p| p.failing) {
            return Err(AppError::Navigation(format!("net::ERR_FAILED at {url}")));
        }
        state.page = Some(url.to_string());
        state.current = page
            .and_then(|p| p.redirect.clone())
            .unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some((remaining, cookies)) = state.pending_login.take() {
            if remaining <= 1 {
                state.logged_in = true;
                state.current = SIGNED_IN_ADDRESS.to_string();
                state.cookies = cookies;
            } else {
                state.pending_login = Some((remaining - 1, cookies));
            }
        }
        Ok(state.current.clone())
    }

    async fn wait_for(&self, target: Target, _timeout: Duration) -> Result<bool, AppError> {
        if target == Target::LoginIndicator {
            return Ok(self.state.lock().unwrap().logged_in);
        }
        Ok(self.with_current_page(|p| p.is_some_and(|p| p.present.contains(&target))))
    }

    async fn pagination_controls(&self) -> Result<Vec<PaginationControl>, AppError> {
        Ok(self.with_current_page(|p| p.map(|p| p.controls.clone()).unwrap_or_default()))
    }

    async fn links(&self, target: Target) -> Result<Vec<String>, AppError> {
        Ok(self.with_current_page(|p| {
            p.and_then(|p| p.links.get(&target).cloned())
                .unwrap_or_default()
        }))
    }

    async fn profile_entries(&self) -> Result<Vec<ScrapedProfile>, AppError> {
        Ok(self.with_current_page(|p| p.map(|p| p.profiles.clone()).unwrap_or_default()))
    }

    async fn text_of(&self, target: Target) -> Result<Option<String>, AppError> {
        Ok(self.with_current_page(|p| p.and_then(|p| p.texts.get(&target).cloned())))
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, AppError> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn set_cookies(&self, cookies: Vec<SessionCookie>) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(name) = &self.session_cookie {
            if cookies.iter().any(|c| &c.name == name) {
                state.logged_in = true;
            }
        }
        state.cookies = cookies;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockDatasetStore
// ---------------------------------------------------------------------------

/// In-memory dataset store that records every successful save.
#[derive(Clone, Default)]
pub struct MockDatasetStore {
    initial: Dataset,
    save_errors: Arc<Mutex<VecDeque<AppError>>>,
    pub saved: Arc<Mutex<Vec<Dataset>>>,
}

impl MockDatasetStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            initial: dataset,
            ..Self::default()
        }
    }

    /// The next save fails with `error`; later saves succeed.
    pub fn with_save_error(error: AppError) -> Self {
        Self::with_save_errors(vec![error])
    }

    pub fn with_save_errors(errors: Vec<AppError>) -> Self {
        Self {
            save_errors: Arc::new(Mutex::new(errors.into())),
            ..Self::default()
        }
    }
}

impl DatasetStore for MockDatasetStore {
    fn load(&self) -> Result<Dataset, AppError> {
        Ok(self.initial.clone())
    }

    fn save(&self, dataset: &Dataset) -> Result<(), AppError> {
        if let Some(e) = self.save_errors.lock().unwrap().pop_front() {
            return Err(e);
        }
        self.saved.lock().unwrap().push(dataset.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records event names, optionally cancelling a token when a
/// given event is seen.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<&'static str>>>,
    cancel_on: Option<(&'static str, CancellationToken)>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_on(event: &'static str, token: CancellationToken) -> Self {
        Self {
            cancel_on: Some((event, token)),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| **e == name).count()
    }
}

impl HarvestReporter for RecordingReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        let name = event.name();
        self.events.lock().unwrap().push(name);
        if let Some((trigger, token)) = &self.cancel_on {
            if *trigger == name {
                token.cancel();
            }
        }
    }
}

//! Minimum spacing between navigations.
//!
//! Wraps any [`PageSource`] so that consecutive `navigate` calls are at least
//! `delay` apart. Everything other than navigation is passed straight
//! through.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use rollcall_core::throttle::ThrottledSource;
//! # use rollcall_core::traits::PageSource;
//! # fn wrap<P: PageSource>(inner: P) -> ThrottledSource<P> {
//! let source = ThrottledSource::new(inner, Duration::from_secs(3));
//! # source
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::{ScrapedProfile, SessionCookie};
use crate::pagination::PaginationControl;
use crate::traits::{PageSource, Target};

/// A [`PageSource`] wrapper that spaces out navigations.
pub struct ThrottledSource<P> {
    inner: P,
    delay: Duration,
    last_navigation: Arc<Mutex<Option<Instant>>>,
}

impl<P: PageSource> ThrottledSource<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            last_navigation: Arc::new(Mutex::new(None)),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    async fn wait_turn(&self) {
        let mut last = self.last_navigation.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.delay {
                let pause = self.delay - elapsed;
                tracing::debug!(sleep_ms = %pause.as_millis(), "Throttling navigation");
                tokio::time::sleep(pause).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl<P: PageSource> PageSource for ThrottledSource<P> {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        self.wait_turn().await;
        self.inner.navigate(url).await
    }

    async fn current_url(&self) -> Result<String, AppError> {
        self.inner.current_url().await
    }

    async fn wait_for(&self, target: Target, timeout: Duration) -> Result<bool, AppError> {
        self.inner.wait_for(target, timeout).await
    }

    async fn pagination_controls(&self) -> Result<Vec<PaginationControl>, AppError> {
        self.inner.pagination_controls().await
    }

    async fn links(&self, target: Target) -> Result<Vec<String>, AppError> {
        self.inner.links(target).await
    }

    async fn profile_entries(&self) -> Result<Vec<ScrapedProfile>, AppError> {
        self.inner.profile_entries().await
    }

    async fn text_of(&self, target: Target) -> Result<Option<String>, AppError> {
        self.inner.text_of(target).await
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, AppError> {
        self.inner.cookies().await
    }

    async fn set_cookies(&self, cookies: Vec<SessionCookie>) -> Result<(), AppError> {
        self.inner.set_cookies(cookies).await
    }
}

//! Authenticated session acquisition.
//!
//! A saved cookie jar is tried first. If it is missing, unreadable or no
//! longer signs the browser in, the user is asked to log in by hand and the
//! resulting cookies are written back for the next run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{SessionConfig, SiteConfig};
use crate::error::AppError;
use crate::models::SessionCookie;
use crate::traits::{PageSource, Target};

/// JSON file holding the session cookies.
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved cookies, or `None` if the jar does not exist yet.
    pub fn load(&self) -> Result<Option<Vec<SessionCookie>>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let cookies: Vec<SessionCookie> = serde_json::from_str(&raw)?;
        Ok(Some(cookies))
    }

    pub fn save(&self, cookies: &[SessionCookie]) -> Result<(), AppError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(cookies)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// How the session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Cookies from the jar were accepted.
    Restored,
    /// The user logged in by hand; cookies were saved.
    Interactive,
}

/// Make sure `source` is signed in to `site`.
///
/// Fails with [`AppError::Session`] if no login is detected within
/// `config.login_timeout`.
pub async fn acquire_session<P: PageSource>(
    source: &P,
    jar: &CookieJar,
    site: &SiteConfig,
    config: &SessionConfig,
) -> Result<SessionOrigin, AppError> {
    if restore_session(source, jar, site, config).await? {
        tracing::info!("Restored saved session");
        return Ok(SessionOrigin::Restored);
    }

    wait_for_login(source, site, config).await?;

    match source.cookies().await {
        Ok(cookies) if cookies.is_empty() => tracing::warn!("No cookies to save"),
        Ok(cookies) => match jar.save(&cookies) {
            Ok(()) => tracing::info!(
                count = cookies.len(),
                path = %jar.path().display(),
                "Saved session cookies"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to save session cookies"),
        },
        Err(e) => tracing::error!(error = %e, "Failed to read session cookies"),
    }

    Ok(SessionOrigin::Interactive)
}

async fn restore_session<P: PageSource>(
    source: &P,
    jar: &CookieJar,
    site: &SiteConfig,
    config: &SessionConfig,
) -> Result<bool, AppError> {
    let cookies = match jar.load() {
        Ok(Some(cookies)) if !cookies.is_empty() => cookies,
        Ok(_) => {
            tracing::info!(path = %jar.path().display(), "No saved session");
            return Ok(false);
        }
        Err(e) => {
            tracing::warn!(
                path = %jar.path().display(),
                error = %e,
                "Unreadable cookie jar, ignoring"
            );
            return Ok(false);
        }
    };

    source.navigate(site.root()).await?;
    source.set_cookies(cookies).await?;
    source.navigate(site.root()).await?;

    let signed_in = source
        .wait_for(Target::LoginIndicator, config.verify_timeout)
        .await?;
    if !signed_in {
        tracing::warn!("Saved session was not accepted");
    }
    Ok(signed_in)
}

async fn wait_for_login<P: PageSource>(
    source: &P,
    site: &SiteConfig,
    config: &SessionConfig,
) -> Result<(), AppError> {
    tracing::info!("Manual login required, please sign in in the browser window");
    source.navigate(&site.login_url()).await?;

    let deadline = Instant::now() + config.login_timeout;
    loop {
        match source.current_url().await {
            Ok(url) if site.is_signed_in_address(&url) => {
                if source
                    .wait_for(Target::LoginIndicator, Duration::ZERO)
                    .await
                    .unwrap_or(false)
                {
                    tracing::info!("Login detected");
                    return Ok(());
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Could not read login state"),
        }

        if Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(config.poll_interval).await;
    }

    Err(AppError::Session(format!(
        "Login not detected within {} seconds",
        config.login_timeout.as_secs()
    )))
}

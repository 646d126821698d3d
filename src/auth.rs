//! Portal login and the session-cookie hand-off to the HTTP side.
//!
//! The browser logs in through the portal's front-page form. Its session
//! cookie is then read once and seeds [`HttpSession`](crate::download::HttpSession),
//! so files are fetched under the same authenticated session.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::browser::{Browser, Locator};
use crate::download::SessionCookie;
use crate::error::CrawlError;
use crate::navigation::wait_for_absence;

/// Environment variable holding the portal username.
pub const USERNAME_ENV: &str = "HARVESTER_USERNAME";
/// Environment variable holding the portal password.
pub const PASSWORD_ENV: &str = "HARVESTER_PASSWORD";

const LOGIN_FORM: Locator = Locator::Class("fpsignup");
const SUBMIT_BUTTON: Locator = Locator::Css(".sign-up-btn .btn");

/// Errors raised while logging in.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login form was still shown after submitting the credentials.
    #[error("login failed: the portal still shows the sign-in form")]
    LoginFailed,

    /// The portal did not set its session cookie.
    #[error("session cookie '{name}' not found after login")]
    MissingCookie {
        /// Cookie that was looked up.
        name: String,
    },

    /// The credentials file could not be read.
    #[error("failed to read credentials file {path}: {source}")]
    CredentialsIo {
        /// File being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The credentials file is not `{ "username", "password" }` JSON.
    #[error("invalid credentials file {path}: {source}")]
    CredentialsFormat {
        /// File being parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Interactive prompting failed (no terminal, EOF).
    #[error("failed to prompt for credentials: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Browser interaction failed.
    #[error(transparent)]
    Crawl(#[from] CrawlError),
}

impl From<crate::browser::BrowserError> for AuthError {
    fn from(error: crate::browser::BrowserError) -> Self {
        Self::Crawl(error.into())
    }
}

/// Portal username and password.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Portal username.
    pub username: String,
    /// Portal password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl Credentials {
    /// Reads `{ "username": ..., "password": ... }` from `path`.
    ///
    /// # Errors
    ///
    /// [`AuthError::CredentialsIo`] or [`AuthError::CredentialsFormat`].
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AuthError::CredentialsIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AuthError::CredentialsFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads both values from the environment; `None` unless both are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let username = lookup(USERNAME_ENV).filter(|v| !v.is_empty())?;
        let password = lookup(PASSWORD_ENV).filter(|v| !v.is_empty())?;
        Some(Self { username, password })
    }

    /// Asks on the terminal, with the password hidden. A known username
    /// is used as is and only the password is asked for.
    ///
    /// # Errors
    ///
    /// [`AuthError::Prompt`] when no terminal is available.
    pub fn prompt(username: Option<String>) -> Result<Self, AuthError> {
        let username = match username {
            Some(username) => username,
            None => dialoguer::Input::<String>::new()
                .with_prompt("Username")
                .interact_text()?,
        };
        let password = dialoguer::Password::new()
            .with_prompt("Password")
            .interact()?;
        Ok(Self { username, password })
    }

    /// Resolves credentials: a JSON file, then the environment, then the
    /// terminal.
    ///
    /// # Errors
    ///
    /// See [`from_file`](Self::from_file) and [`prompt`](Self::prompt).
    pub fn resolve(file: Option<&Path>, username: Option<String>) -> Result<Self, AuthError> {
        if let Some(path) = file {
            debug!(path = %path.display(), "reading credentials file");
            return Self::from_file(path);
        }
        if let Some(credentials) = Self::from_env() {
            debug!("using credentials from environment");
            return Ok(credentials);
        }
        Self::prompt(username)
    }
}

/// Returns true when the active page shows the portal's sign-in form.
///
/// # Errors
///
/// Propagates rendering-engine failures.
pub async fn needs_login<B: Browser + ?Sized>(browser: &B) -> Result<bool, AuthError> {
    Ok(browser.find_first(None, LOGIN_FORM).await?.is_some())
}

/// Fills and submits the sign-in form, then waits for it to go away.
///
/// Does nothing when no form is shown.
///
/// # Errors
///
/// [`AuthError::LoginFailed`] if the form is still present after `timeout`.
pub async fn login<B: Browser + ?Sized>(
    browser: &B,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<(), AuthError> {
    let Some(form) = browser.find_first(None, LOGIN_FORM).await? else {
        debug!("no sign-in form; session already authenticated");
        return Ok(());
    };

    if let Some(field) = browser.find_first(Some(&form), Locator::Id("username")).await? {
        browser.send_keys(&field, &credentials.username).await?;
    }
    if let Some(field) = browser.find_first(Some(&form), Locator::Id("password")).await? {
        browser.send_keys(&field, &credentials.password).await?;
    }
    let Some(submit) = browser.find_first(Some(&form), SUBMIT_BUTTON).await? else {
        return Err(AuthError::LoginFailed);
    };
    browser.click(&submit).await?;

    match wait_for_absence(browser, LOGIN_FORM, timeout).await {
        Ok(()) => {
            info!(user = %credentials.username, "logged in");
            Ok(())
        }
        Err(CrawlError::NavigationTimeout { .. }) => Err(AuthError::LoginFailed),
        Err(other) => Err(other.into()),
    }
}

/// Reads the session cookie `name` from the browser.
///
/// # Errors
///
/// [`AuthError::MissingCookie`] if the portal did not set it.
pub async fn session_cookie<B: Browser + ?Sized>(
    browser: &B,
    name: &str,
) -> Result<SessionCookie, AuthError> {
    let Some(value) = browser.cookie(name).await? else {
        return Err(AuthError::MissingCookie {
            name: name.to_string(),
        });
    };
    Ok(SessionCookie::new(name, value))
}

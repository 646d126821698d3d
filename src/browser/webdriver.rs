//! [`Browser`] over a W3C WebDriver session (geckodriver by default).

use std::fmt::Display;

use async_trait::async_trait;
use thirtyfour::prelude::*;
use thirtyfour::{Cookie, Key, WindowHandle};
use tracing::{debug, instrument};

use super::{Browser, BrowserError, ContextHandle, Locator};

/// Strips the portal's `onclick` handler so a modified click is handled by the
/// browser itself (new tab) instead of the page's JavaScript.
const REMOVE_ONCLICK_SCRIPT: &str = r#"arguments[0].removeAttribute("onclick");"#;

/// Browser driven through a WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverBrowser {
    driver: WebDriver,
}

impl WebDriverBrowser {
    /// Starts a Firefox session on the WebDriver server at `server_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Driver`] if the server is unreachable or
    /// refuses the session.
    #[instrument(level = "debug")]
    pub async fn connect(server_url: &str, headless: bool) -> Result<Self, BrowserError> {
        let mut caps = DesiredCapabilities::firefox();
        if headless {
            caps.set_headless().map_err(map_error)?;
        }
        let driver = WebDriver::new(server_url, caps).await.map_err(map_error)?;
        debug!("webdriver session started");
        Ok(Self { driver })
    }
}

fn to_by(locator: Locator) -> By {
    match locator {
        Locator::Class(name) => By::ClassName(name),
        Locator::Tag(name) => By::Tag(name),
        Locator::Css(selector) => By::Css(selector),
        Locator::Id(id) => By::Id(id),
    }
}

// The driver's error enum is not stable across releases; staleness and
// unknown windows are recognised by their W3C error codes in the message.
fn cookie_value(cookies: &[Cookie], name: &str) -> Option<String> {
    cookies
        .iter()
        .find(|cookie| cookie.name == name)
        .map(|cookie| cookie.value.clone())
}

fn map_error(error: impl Display) -> BrowserError {
    let message = error.to_string();
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("stale element") {
        BrowserError::StaleReference
    } else {
        BrowserError::Driver { message }
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    type Element = WebElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.driver.goto(url).await.map_err(map_error)
    }

    async fn find_all(
        &self,
        scope: Option<&WebElement>,
        locator: Locator,
    ) -> Result<Vec<WebElement>, BrowserError> {
        let by = to_by(locator);
        let found = match scope {
            Some(element) => element.find_all(by).await,
            None => self.driver.find_all(by).await,
        };
        found.map_err(map_error)
    }

    async fn text(&self, element: &WebElement) -> Result<String, BrowserError> {
        element.text().await.map_err(map_error)
    }

    async fn attribute(
        &self,
        element: &WebElement,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        // Properties resolve `href`/`src`/`action` to absolute URLs. A missing
        // `href` still reads as an empty property, so that falls through.
        if let Some(value) = element.prop(name).await.map_err(map_error)?
            && !value.is_empty()
        {
            return Ok(Some(value));
        }
        element.attr(name).await.map_err(map_error)
    }

    async fn send_keys(&self, element: &WebElement, text: &str) -> Result<(), BrowserError> {
        element.send_keys(text).await.map_err(map_error)
    }

    async fn click(&self, element: &WebElement) -> Result<(), BrowserError> {
        element.click().await.map_err(map_error)
    }

    async fn open_in_new_context(&self, element: &WebElement) -> Result<(), BrowserError> {
        let args = vec![element.to_json().map_err(map_error)?];
        self.driver
            .execute(REMOVE_ONCLICK_SCRIPT, args)
            .await
            .map_err(map_error)?;
        self.driver
            .action_chain()
            .key_down(Key::Control)
            .click_element(element)
            .key_up(Key::Control)
            .perform()
            .await
            .map_err(map_error)
    }

    async fn context_handles(&self) -> Result<Vec<ContextHandle>, BrowserError> {
        let windows = self.driver.windows().await.map_err(map_error)?;
        Ok(windows
            .into_iter()
            .map(|window| ContextHandle::new(window.to_string()))
            .collect())
    }

    async fn active_context(&self) -> Result<ContextHandle, BrowserError> {
        let window = self.driver.window().await.map_err(map_error)?;
        Ok(ContextHandle::new(window.to_string()))
    }

    async fn switch_to(&self, handle: &ContextHandle) -> Result<(), BrowserError> {
        let window = WindowHandle::from(handle.as_str().to_string());
        self.driver
            .switch_to_window(window)
            .await
            .map_err(|error| match map_error(error) {
                BrowserError::Driver { message }
                    if message.to_ascii_lowercase().contains("no such window") =>
                {
                    BrowserError::no_such_context(handle.clone())
                }
                other => other,
            })
    }

    async fn close_active(&self) -> Result<(), BrowserError> {
        self.driver.close_window().await.map_err(map_error)
    }

    async fn cookie(&self, name: &str) -> Result<Option<String>, BrowserError> {
        let cookies = self.driver.get_all_cookies().await.map_err(map_error)?;
        Ok(cookie_value(&cookies, name))
    }

    async fn clear_cookies(&self) -> Result<(), BrowserError> {
        self.driver.delete_all_cookies().await.map_err(map_error)
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        self.driver.clone().quit().await.map_err(map_error)
    }
}

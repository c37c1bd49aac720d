// src/linkedin_analysis/browser_session.rs
//! Chromium-backed LinkedIn session and the page operations the scraper relies on

use crate::config::{BrowserSettings, Credentials};
use crate::error::PipelineError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

pub const LOGIN_URL: &str = "https://www.linkedin.com/login";

const IDENTITY_INPUT: &str = "input[name=\"session_key\"]";
const SECRET_INPUT: &str = "input[name=\"session_password\"]";
const SUBMIT_BUTTON: &str = "button[type=\"submit\"]";
pub(crate) const LOGIN_SUCCESS: &str = "div.feed-identity-module";

pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The handful of page interactions the login flow and the job scraper need.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;
    async fn click(&self, selector: &str) -> Result<()>;
    async fn exists(&self, selector: &str) -> Result<bool>;
    async fn count(&self, selector: &str) -> Result<usize>;
    async fn click_nth(&self, selector: &str, index: usize) -> Result<()>;
    async fn nth_html(&self, selector: &str, index: usize) -> Result<String>;
    async fn html(&self) -> Result<String>;
}

/// Poll until `selector` matches or `timeout` elapses. Lookup errors count as "not yet".
pub async fn wait_for<P: BrowserPage + ?Sized>(page: &P, selector: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match page.exists(selector).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => debug!("Check for {} failed: {:#}", selector, e),
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Fill and submit the login form, then wait for the feed to confirm the session.
pub async fn login<P: BrowserPage + ?Sized>(
    page: &P,
    credentials: &Credentials,
    settings: &BrowserSettings,
) -> Result<(), PipelineError> {
    info!("Logging into LinkedIn as {}", credentials.identity);

    page.navigate(LOGIN_URL)
        .await
        .map_err(PipelineError::authentication)?;
    page.fill(IDENTITY_INPUT, &credentials.identity)
        .await
        .map_err(PipelineError::authentication)?;
    page.fill(SECRET_INPUT, &credentials.secret)
        .await
        .map_err(PipelineError::authentication)?;
    page.click(SUBMIT_BUTTON)
        .await
        .map_err(PipelineError::authentication)?;

    debug!("Waiting for login to complete");
    if !wait_for(page, LOGIN_SUCCESS, settings.login_timeout()).await {
        return Err(PipelineError::Authentication(format!(
            "login did not reach the feed within {}s",
            settings.login_timeout_secs
        )));
    }

    info!("Successfully logged in");
    sleep(settings.post_login_settle()).await;
    Ok(())
}

pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid browser configuration: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open browser page")?;

        info!(headless = settings.headless, "Browser session started");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();
        info!("Browser session closed");
    }

    async fn nth_element(&self, selector: &str, index: usize) -> Result<chromiumoxide::Element> {
        let mut elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("Failed to query {}", selector))?;
        if index >= elements.len() {
            anyhow::bail!(
                "Element {} of {} is gone ({} left)",
                index,
                selector,
                elements.len()
            );
        }
        Ok(elements.swap_remove(index))
    }
}

#[async_trait]
impl BrowserPage for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to open {}", url))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("Input not found: {}", selector))?
            .click()
            .await
            .with_context(|| format!("Failed to focus {}", selector))?
            .type_str(text)
            .await
            .with_context(|| format!("Failed to type into {}", selector))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("Element not found: {}", selector))?
            .click()
            .await
            .with_context(|| format!("Failed to click {}", selector))?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("Failed to query {}", selector))?;
        Ok(!elements.is_empty())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("Failed to query {}", selector))?;
        Ok(elements.len())
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<()> {
        self.nth_element(selector, index)
            .await?
            .click()
            .await
            .with_context(|| format!("Failed to click {} #{}", selector, index))?;
        Ok(())
    }

    async fn nth_html(&self, selector: &str, index: usize) -> Result<String> {
        let html = self
            .nth_element(selector, index)
            .await?
            .outer_html()
            .await
            .with_context(|| format!("Failed to read {} #{}", selector, index))?;
        Ok(html.unwrap_or_default())
    }

    async fn html(&self) -> Result<String> {
        self.page.content().await.context("Failed to read page content")
    }
}

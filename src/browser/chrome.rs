//! Headless Chromium browser.
//!
//! Each navigation runs `chromium --headless --dump-dom <url>` against a
//! per-session profile directory, so cookies set by one page are visible to
//! the next. The dumped DOM is kept as a [`Document`] for selector queries.

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::BrowserError;

use super::dom::{Document, Element};
use super::{Browser, Page};

/// Launches Chromium sessions.
#[derive(Debug, Clone)]
pub struct ChromeBrowser {
    chrome_bin: String,
}

impl ChromeBrowser {
    pub fn new(chrome_bin: impl Into<String>) -> Self {
        Self {
            chrome_bin: chrome_bin.into(),
        }
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError> {
        let profile = tempfile::Builder::new()
            .prefix("scholar-outreach-")
            .tempdir()
            .map_err(|e| BrowserError::Launch(format!("Failed to create profile dir: {e}")))?;
        info!(profile = %profile.path().display(), bin = %self.chrome_bin, "Browser session ready");
        Ok(Box::new(ChromePage {
            chrome_bin: self.chrome_bin.clone(),
            profile: Some(profile),
            url: None,
            document: None,
        }))
    }
}

/// A Chromium session.
pub struct ChromePage {
    chrome_bin: String,
    profile: Option<TempDir>,
    url: Option<String>,
    document: Option<Document>,
}

impl ChromePage {
    async fn dump_dom(&self, url: &str) -> Result<String, BrowserError> {
        let profile = self.profile.as_ref().ok_or(BrowserError::Closed)?;

        let parsed = url::Url::parse(url).map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            reason: format!("Invalid URL: {e}"),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: format!("Only http/https URLs are allowed, got: {}", parsed.scheme()),
            });
        }

        let output = tokio::process::Command::new(&self.chrome_bin)
            .args([
                "--headless",
                "--no-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                &format!("--user-data-dir={}", profile.path().display()),
                "--dump-dom",
                parsed.as_str(),
            ])
            .output()
            .await
            .map_err(|e| BrowserError::Launch(format!("Failed to run {}: {e}", self.chrome_bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, stderr = %stderr, "Chrome exited with error");
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: format!("Chrome exited with {}", output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!(url, "Navigating");
        let html = self.dump_dom(url).await?;
        if html.trim().is_empty() {
            warn!(url, "Empty DOM output");
        }
        self.url = Some(url.to_string());
        self.document = Some(Document::new(html));
        Ok(())
    }

    fn current_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn find_all(&self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        self.document
            .as_ref()
            .ok_or(BrowserError::NoPage)?
            .select(selector)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.document = None;
        self.url = None;
        if let Some(profile) = self.profile.take() {
            profile.close()?;
            info!("Browser closed");
        }
        Ok(())
    }
}

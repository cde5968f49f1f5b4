//! Browser capability: navigate to a page and query it with CSS selectors.
//!
//! The research code only sees [`Browser`] and [`Page`]; the production
//! implementation is [`ChromeBrowser`], tests use fixture pages.

pub mod chrome;
pub mod dom;

pub use chrome::ChromeBrowser;
pub use dom::{Document, Element};

use async_trait::async_trait;

use crate::error::BrowserError;

/// A single browsing session holding at most one loaded page.
#[async_trait]
pub trait Page: Send {
    /// Load `url`, replacing whatever was loaded before.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// URL of the loaded page, if any.
    fn current_url(&self) -> Option<&str>;

    /// Every element matching `selector`, in document order.
    fn find_all(&self, selector: &str) -> Result<Vec<Element>, BrowserError>;

    /// First element matching `selector`.
    fn find(&self, selector: &str) -> Result<Option<Element>, BrowserError> {
        Ok(self.find_all(selector)?.into_iter().next())
    }

    /// Rendered text of an element.
    fn text(&self, element: &Element) -> String {
        element.text().to_string()
    }

    /// Release everything the session holds. Called exactly once, at the end of a run.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Factory for browsing sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError>;
}

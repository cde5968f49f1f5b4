//! In-memory capabilities for tests: scripted console, fixture browser,
//! stub model and recording mailer.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::browser::{Browser, Document, Element, Page};
use crate::channels::Console;
use crate::dispatch::{MailTransport, OutgoingMail};
use crate::error::{BrowserError, ConsoleError, LlmError, MailError};
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};

/// Console that answers prompts from a fixed script, then reports closed input.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    prompts: Vec<String>,
    shown: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Everything shown, one entry per line, joined with newlines.
    pub fn transcript(&self) -> String {
        self.shown.join("\n")
    }

    /// Prompts shown before each read, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Inputs not yet consumed.
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ConsoleError> {
        self.prompts.push(prompt.to_string());
        Ok(self.inputs.pop_front())
    }

    fn show(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }
}

#[derive(Debug, Clone, Default)]
struct FixtureSite {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    refuse_open: bool,
}

/// Browser serving canned HTML by URL.
///
/// Unknown URLs fail navigation. Clones share the visit log and close count.
#[derive(Debug, Clone, Default)]
pub struct FixtureBrowser {
    site: Arc<FixtureSite>,
    visited: Arc<Mutex<Vec<String>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn site_mut(&mut self) -> &mut FixtureSite {
        Arc::make_mut(&mut self.site)
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.site_mut().pages.insert(url.to_string(), html.into());
        self
    }

    /// Navigation to `url` returns an error.
    pub fn failing(mut self, url: &str) -> Self {
        self.site_mut().failing.insert(url.to_string());
        self
    }

    /// Navigation to `url` panics.
    pub fn panicking(mut self, url: &str) -> Self {
        self.site_mut().panicking.insert(url.to_string());
        self
    }

    /// `open` fails, as when the browser binary is missing.
    pub fn refusing_open(mut self) -> Self {
        self.site_mut().refuse_open = true;
        self
    }

    /// Every URL navigated to, in order.
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError> {
        if self.site.refuse_open {
            return Err(BrowserError::Launch("fixture browser refused to start".into()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixturePage {
            browser: self.clone(),
            url: None,
            document: None,
            closed: false,
        }))
    }
}

/// Page of a [`FixtureBrowser`].
#[derive(Debug)]
pub struct FixturePage {
    browser: FixtureBrowser,
    url: Option<String>,
    document: Option<Document>,
    closed: bool,
}

#[async_trait]
impl Page for FixturePage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        if let Ok(mut visited) = self.browser.visited.lock() {
            visited.push(url.to_string());
        }

        let site = &self.browser.site;
        if site.panicking.contains(url) {
            panic!("fixture panic: {url}");
        }
        if site.failing.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "fixture failure".into(),
            });
        }
        match site.pages.get(url) {
            Some(html) => {
                self.url = Some(url.to_string());
                self.document = Some(Document::new(html.clone()));
                Ok(())
            }
            None => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "no fixture page".into(),
            }),
        }
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
        if !self.closed {
            self.closed = true;
            self.browser.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Debug)]
enum StubReply {
    Text(String),
    Fail(String),
    Panic(String),
}

/// Model with a canned reply, failure or panic.
#[derive(Debug)]
pub struct StubLlm {
    reply: StubReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl StubLlm {
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_reply(StubReply::Text(text.into()))
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_reply(StubReply::Fail(reason.into()))
    }

    /// Every call panics with `message`.
    pub fn panicking(message: impl Into<String>) -> Self {
        Self::with_reply(StubReply::Panic(message.into()))
    }

    fn with_reply(reply: StubReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // word counts stand in for token usage
        let request_tokens: u32 = request
            .messages
            .iter()
            .map(|m| m.content.split_whitespace().count() as u32)
            .sum();
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }
        match &self.reply {
            StubReply::Text(content) => Ok(CompletionResponse {
                content: content.clone(),
                input_tokens: request_tokens,
                output_tokens: content.split_whitespace().count() as u32,
            }),
            StubReply::Fail(reason) => Err(LlmError::RequestFailed {
                provider: "stub".into(),
                reason: reason.clone(),
            }),
            StubReply::Panic(message) => panic!("{message}"),
        }
    }
}

/// Mail transport that records deliveries instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    failure: Option<MailError>,
    sent: Mutex<Vec<OutgoingMail>>,
    attempts: AtomicUsize,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delivery fails with `error`.
    pub fn failing(error: MailError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    /// Successfully delivered mail.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn deliver(&self, mail: &OutgoingMail, _password: &SecretString) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        Ok(())
    }
}

//! Field extraction: best-effort reads of a loaded page.
//!
//! Every field is looked up independently; a failed lookup leaves that field
//! empty and extraction moves on to the next one.

use std::time::Duration;

use tracing::{debug, info};

use crate::browser::Page;
use crate::error::BrowserError;

use super::types::Fields;

/// Which part of [`Fields`] a lookup fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSlot {
    Phrases,
    Titles,
    Scalar,
    Snippet,
    TextLength,
}

/// How to find a field's value on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRule {
    /// Texts of every match; empty texts dropped.
    All(String),
    /// Text of the first match.
    First(String),
    /// First match whose own text contains any needle; its full text, truncated.
    FirstContaining {
        selector: String,
        needles: Vec<String>,
        max_chars: usize,
    },
    /// Character count of the first match's text.
    TextLength(String),
}

/// One field to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub slot: FieldSlot,
    pub rule: SelectionRule,
    /// Maximum number of matches considered.
    pub limit: Option<usize>,
}

impl FieldSpec {
    pub fn new(name: &'static str, slot: FieldSlot, rule: SelectionRule) -> Self {
        Self {
            name,
            slot,
            rule,
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A value read from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    List(Vec<String>),
    Text(String),
    Count(usize),
}

/// Result of a single field lookup.
#[derive(Debug)]
pub enum FieldOutcome {
    Found(FieldValue),
    Absent,
    Failed(BrowserError),
}

/// Navigate and give client-side rendering time to finish.
pub async fn navigate_and_settle(
    page: &mut dyn Page,
    url: &str,
    settle_delay: Duration,
) -> Result<(), BrowserError> {
    page.navigate(url).await?;
    if !settle_delay.is_zero() {
        debug!(url, delay_ms = settle_delay.as_millis() as u64, "Waiting for page to settle");
        tokio::time::sleep(settle_delay).await;
    }
    Ok(())
}

/// Reads [`Fields`] out of loaded pages.
#[derive(Debug, Clone)]
pub struct Extractor {
    settle_delay: Duration,
}

impl Extractor {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    /// Load `url` into `page`, then wait for the settle delay.
    pub async fn load(&self, page: &mut dyn Page, url: &str) -> Result<(), BrowserError> {
        navigate_and_settle(page, url, self.settle_delay).await
    }

    /// Extract every spec from the loaded page. Never fails.
    pub fn extract(&self, page: &dyn Page, specs: &[FieldSpec], url: &str) -> Fields {
        let mut fields = Fields::new(url);
        for spec in specs {
            match lookup(page, spec) {
                FieldOutcome::Found(value) => apply(&mut fields, spec.slot, value),
                FieldOutcome::Absent => debug!(field = spec.name, url, "Field not present"),
                FieldOutcome::Failed(e) => {
                    info!(field = spec.name, url, error = %e, "Could not extract field");
                }
            }
        }
        fields
    }
}

/// Look up a single field.
pub fn lookup(page: &dyn Page, spec: &FieldSpec) -> FieldOutcome {
    let limited = |mut elements: Vec<crate::browser::Element>| {
        if let Some(limit) = spec.limit {
            elements.truncate(limit);
        }
        elements
    };

    let result = match &spec.rule {
        SelectionRule::All(selector) => page.find_all(selector).map(|elements| {
            let texts: Vec<String> = limited(elements)
                .iter()
                .map(|el| page.text(el))
                .filter(|text| !text.is_empty())
                .collect();
            (!texts.is_empty()).then_some(FieldValue::List(texts))
        }),
        SelectionRule::First(selector) => page.find(selector).map(|found| {
            found
                .map(|el| page.text(&el))
                .filter(|text| !text.is_empty())
                .map(FieldValue::Text)
        }),
        SelectionRule::FirstContaining {
            selector,
            needles,
            max_chars,
        } => page.find_all(selector).map(|elements| {
            limited(elements)
                .into_iter()
                .find(|el| needles.iter().any(|n| el.own_text().contains(n.as_str())))
                .map(|el| page.text(&el).chars().take(*max_chars).collect::<String>())
                .filter(|text| !text.is_empty())
                .map(FieldValue::Text)
        }),
        SelectionRule::TextLength(selector) => page
            .find(selector)
            .map(|found| found.map(|el| FieldValue::Count(page.text(&el).chars().count()))),
    };

    match result {
        Ok(Some(value)) => FieldOutcome::Found(value),
        Ok(None) => FieldOutcome::Absent,
        Err(e) => FieldOutcome::Failed(e),
    }
}

fn apply(fields: &mut Fields, slot: FieldSlot, value: FieldValue) {
    match slot {
        FieldSlot::Phrases => fields.phrases = value.into_list(),
        FieldSlot::Titles => fields.titles = value.into_list(),
        FieldSlot::Scalar => fields.scalar = value.into_text(),
        FieldSlot::Snippet => fields.snippet = value.into_text(),
        FieldSlot::TextLength => fields.text_length = Some(value.into_count()),
    }
}

impl FieldValue {
    fn into_list(self) -> Vec<String> {
        match self {
            Self::List(items) => items,
            Self::Text(text) => vec![text],
            Self::Count(n) => vec![n.to_string()],
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            Self::List(items) => items.into_iter().next(),
            Self::Text(text) => Some(text),
            Self::Count(n) => Some(n.to_string()),
        }
    }

    fn into_count(self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Text(text) => text.chars().count(),
            Self::Count(n) => n,
        }
    }
}

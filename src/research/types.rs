//! Research context: per-source results merged in configuration order.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Source name of the scholar profile aggregator.
pub const SCHOLAR: &str = "scholar";
/// Source name of the institution's staff directory.
pub const INSTITUTION: &str = "institution";

/// Everything extracted from one source page. Any sub-field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Fields {
    /// Short phrases, e.g. research interests.
    pub phrases: Vec<String>,
    /// Longer strings, e.g. recent publication titles.
    pub titles: Vec<String>,
    /// Free-text scalar, e.g. a citation count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalar: Option<String>,
    /// Prose excerpt, e.g. the start of a biography.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Character count of the page's main text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    /// Page the fields were read from.
    pub url: String,
}

impl Fields {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Outcome of researching a single source.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceResult {
    Data(Fields),
    Skipped,
    Error { message: String },
}

impl SourceResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn fields(&self) -> Option<&Fields> {
        match self {
            Self::Data(fields) => Some(fields),
            _ => None,
        }
    }

    /// Short label for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Skipped => "skipped",
            Self::Error { .. } => "error",
        }
    }
}

/// Ordered mapping source name → result. Built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchContext {
    sources: Vec<(String, SourceResult)>,
}

impl ResearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result for `source`. A repeated name replaces the earlier
    /// result in place, keeping its position.
    pub fn record(&mut self, source: impl Into<String>, result: SourceResult) {
        let source = source.into();
        match self.sources.iter_mut().find(|(name, _)| *name == source) {
            Some((_, slot)) => *slot = result,
            None => self.sources.push((source, result)),
        }
    }

    pub fn get(&self, source: &str) -> Option<&SourceResult> {
        self.sources
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceResult)> {
        self.sources.iter().map(|(name, result)| (name.as_str(), result))
    }

    /// Fields of every source that produced data, in order.
    pub fn data(&self) -> impl Iterator<Item = &Fields> {
        self.sources.iter().filter_map(|(_, result)| result.fields())
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Pretty JSON for the approval screen.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unprintable: {e}>"))
    }
}

impl Serialize for ResearchContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sources.len()))?;
        for (name, result) in &self.sources {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

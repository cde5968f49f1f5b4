//! Source definitions: where to search, what to read.

use crate::config::ResearchSettings;

use super::extractor::{FieldSlot, FieldSpec, SelectionRule};
use super::types::{INSTITUTION, SCHOLAR};

/// Placeholder for the target's name in [`SearchSpec::query_template`].
pub const NAME_PLACEHOLDER: &str = "{name}";
/// Placeholder for the encoded query in [`SearchSpec::url_template`].
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Most recent publications read from a scholar profile.
pub const MAX_RECENT_TITLES: usize = 5;
/// Longest biography excerpt kept from an institution page.
pub const MAX_SNIPPET_CHARS: usize = 500;

/// How to search a source for the target's profile page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    /// Search page URL with a `{query}` placeholder.
    pub url_template: String,
    /// Query text with a `{name}` placeholder.
    pub query_template: String,
    /// One match per candidate.
    pub candidate_selector: String,
    /// Selector (inside the candidate) of the candidate's name. Defaults to the candidate.
    pub label_selector: Option<String>,
    /// Selector (inside the candidate) of the link. Defaults to the candidate.
    pub link_selector: Option<String>,
    /// Selector (inside the candidate) of extra detail shown after the label.
    pub detail_selector: Option<String>,
    /// Only the first N raw matches are considered.
    pub scan_limit: Option<usize>,
    /// Keep a candidate only when its URL contains one of these (case-insensitive).
    pub href_keywords: Vec<String>,
    /// Truncate labels to this many characters.
    pub label_max_chars: Option<usize>,
    /// Offer a "None of these / enter URL manually" menu entry.
    pub offer_manual: bool,
    /// Offer a "Skip" menu entry.
    pub offer_skip: bool,
}

impl SearchSpec {
    /// The query for `target_name`.
    pub fn query(&self, target_name: &str) -> String {
        self.query_template.replace(NAME_PLACEHOLDER, target_name)
    }

    /// Search page URL for `target_name`, with the query form-encoded.
    pub fn url(&self, target_name: &str) -> String {
        let encoded: String =
            url::form_urlencoded::byte_serialize(self.query(target_name).as_bytes()).collect();
        self.url_template.replace(QUERY_PLACEHOLDER, &encoded)
    }
}

/// One research source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Key in the research context.
    pub name: String,
    /// Human-readable name for prompts.
    pub label: String,
    /// Profile URL supplied up front; skips the search.
    pub explicit_url: Option<String>,
    pub search: SearchSpec,
    pub fields: Vec<FieldSpec>,
}

/// Scholar profile aggregator: interests, recent publications, citations.
pub fn scholar(settings: &ResearchSettings) -> SourceConfig {
    SourceConfig {
        name: SCHOLAR.to_string(),
        label: "Google Scholar".to_string(),
        explicit_url: settings.scholar_url.clone(),
        search: SearchSpec {
            url_template: format!(
                "https://scholar.google.com/citations?view_op=search_authors&mauthors={QUERY_PLACEHOLDER}&hl=en"
            ),
            query_template: format!("{NAME_PLACEHOLDER} {}", settings.affiliation),
            candidate_selector: ".gs_ai_t".to_string(),
            label_selector: Some(".gs_ai_name".to_string()),
            link_selector: Some(".gs_ai_name a".to_string()),
            detail_selector: Some(".gs_ai_aff".to_string()),
            scan_limit: None,
            href_keywords: Vec::new(),
            label_max_chars: None,
            offer_manual: true,
            offer_skip: false,
        },
        fields: vec![
            FieldSpec::new(
                "interests",
                FieldSlot::Phrases,
                SelectionRule::All(".gsc_prf_inta".to_string()),
            ),
            FieldSpec::new(
                "recent_publications",
                FieldSlot::Titles,
                SelectionRule::All(".gsc_a_t".to_string()),
            )
            .limit(MAX_RECENT_TITLES),
            FieldSpec::new(
                "citations",
                FieldSlot::Scalar,
                SelectionRule::First(".gsc_rsb_std".to_string()),
            ),
        ],
    }
}

/// Institution staff directory: biography excerpt and page size.
pub fn institution(settings: &ResearchSettings) -> SourceConfig {
    SourceConfig {
        name: INSTITUTION.to_string(),
        label: format!("{} website", settings.affiliation),
        explicit_url: settings.institution_url.clone(),
        search: SearchSpec {
            url_template: format!("https://www.google.com/search?q={QUERY_PLACEHOLDER}"),
            query_template: format!(
                "{NAME_PLACEHOLDER} {} {} faculty profile",
                settings.affiliation, settings.city
            ),
            candidate_selector: format!(r#"a[href*="{}"]"#, settings.institution_domain),
            label_selector: None,
            link_selector: None,
            detail_selector: None,
            scan_limit: Some(10),
            href_keywords: ["profile", "faculty", "researcher", "staff"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            label_max_chars: Some(60),
            offer_manual: true,
            offer_skip: true,
        },
        fields: vec![
            FieldSpec::new(
                "bio_snippet",
                FieldSlot::Snippet,
                SelectionRule::FirstContaining {
                    selector: "body *".to_string(),
                    needles: ["Research", "Biography", "About"]
                        .iter()
                        .map(|n| n.to_string())
                        .collect(),
                    max_chars: MAX_SNIPPET_CHARS,
                },
            ),
            FieldSpec::new(
                "full_text_length",
                FieldSlot::TextLength,
                SelectionRule::TextLength("body".to_string()),
            ),
        ],
    }
}

/// The default sources, in research order.
pub fn default_sources(settings: &ResearchSettings) -> Vec<SourceConfig> {
    vec![scholar(settings), institution(settings)]
}

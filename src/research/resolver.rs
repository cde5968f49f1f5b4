//! Profile resolver: turns "the professor's page on source X" into one URL.
//!
//! Resolution order: explicit URL, single search hit, human pick from a menu,
//! manual entry. Search failures only ever push the flow towards manual entry.

use std::time::Duration;

use tracing::{info, warn};

use crate::browser::{Element, Page};
use crate::channels::Console;
use crate::error::BrowserError;

use super::extractor::navigate_and_settle;
use super::sources::{SearchSpec, SourceConfig};

/// Most candidates shown in a disambiguation menu.
pub const MAX_MENU_CANDIDATES: usize = 5;

/// A search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub url: String,
}

/// Outcome of resolving a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Skipped,
}

/// What the operator picked from a disambiguation menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Zero-based index into the shown candidates.
    Candidate(usize),
    Manual,
    Skip,
    /// Unparseable or out of range; treated as no selection.
    Invalid,
}

/// Menu layout: candidates numbered from 1, then the enabled extras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Menu {
    pub shown: usize,
    pub offer_manual: bool,
    pub offer_skip: bool,
}

impl Menu {
    pub fn new(candidates: usize, spec: &SearchSpec) -> Self {
        Self {
            shown: candidates.min(MAX_MENU_CANDIDATES),
            offer_manual: spec.offer_manual,
            offer_skip: spec.offer_skip,
        }
    }

    /// Menu number of the manual-entry option, if offered.
    pub fn manual_index(&self) -> Option<usize> {
        self.offer_manual.then_some(self.shown + 1)
    }

    /// Menu number of the skip option, if offered. Follows manual entry when both exist.
    pub fn skip_index(&self) -> Option<usize> {
        self.offer_skip
            .then_some(self.shown + 1 + usize::from(self.offer_manual))
    }

    /// Interpret a typed menu number.
    pub fn parse(&self, input: &str) -> MenuChoice {
        let Ok(number) = input.trim().parse::<usize>() else {
            return MenuChoice::Invalid;
        };
        if (1..=self.shown).contains(&number) {
            MenuChoice::Candidate(number - 1)
        } else if Some(number) == self.manual_index() {
            MenuChoice::Manual
        } else if Some(number) == self.skip_index() {
            MenuChoice::Skip
        } else {
            MenuChoice::Invalid
        }
    }
}

/// Resolves a source's profile URL, asking the operator when needed.
pub struct ProfileResolver<'a> {
    console: &'a mut dyn Console,
    settle_delay: Duration,
}

impl<'a> ProfileResolver<'a> {
    pub fn new(console: &'a mut dyn Console, settle_delay: Duration) -> Self {
        Self {
            console,
            settle_delay,
        }
    }

    /// Resolve `source` for `target_name`.
    pub async fn resolve(
        &mut self,
        page: &mut dyn Page,
        target_name: &str,
        source: &SourceConfig,
    ) -> Resolution {
        if let Some(url) = &source.explicit_url {
            info!(source = %source.name, url = %url, "Using configured profile URL");
            return Resolution::Resolved(url.clone());
        }

        info!(source = %source.name, "Searching for profile");
        let candidates = match search(page, target_name, &source.search, self.settle_delay).await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(source = %source.name, error = %e, "Profile search failed");
                self.console
                    .show(&format!("  Search attempt failed: {}", truncate(&e.to_string(), 100)));
                Vec::new()
            }
        };

        match self.choose(source, &candidates).await {
            MenuChoice::Candidate(index) => Resolution::Resolved(candidates[index].url.clone()),
            MenuChoice::Skip => {
                self.console.show(&format!("  Skipping {}", source.label));
                Resolution::Skipped
            }
            MenuChoice::Manual | MenuChoice::Invalid => self.manual_entry(source).await,
        }
    }

    async fn choose(&mut self, source: &SourceConfig, candidates: &[Candidate]) -> MenuChoice {
        match candidates {
            [] => MenuChoice::Manual,
            [only] => {
                self.console.show(&format!("  Auto-selected: {}", only.label));
                MenuChoice::Candidate(0)
            }
            _ => {
                let menu = Menu::new(candidates.len(), &source.search);
                self.console.show(&format!(
                    "\n  Found {} potential matches on {}. Please select:",
                    candidates.len(),
                    source.label
                ));
                for (i, candidate) in candidates.iter().take(menu.shown).enumerate() {
                    self.console.show(&format!("  {}. {}", i + 1, candidate.label));
                }
                if let Some(n) = menu.manual_index() {
                    self.console
                        .show(&format!("  {n}. None of these / Enter URL manually"));
                }
                if let Some(n) = menu.skip_index() {
                    self.console.show(&format!("  {n}. Skip {}", source.label));
                }

                let input = match self.console.read_line("\n  Enter choice number: ").await {
                    Ok(Some(line)) => line,
                    Ok(None) => return MenuChoice::Invalid,
                    Err(e) => {
                        warn!(error = %e, "Could not read menu choice");
                        return MenuChoice::Invalid;
                    }
                };
                let choice = menu.parse(&input);
                if let MenuChoice::Candidate(index) = choice {
                    self.console.show(&format!("  Selected option {}", index + 1));
                }
                choice
            }
        }
    }

    async fn manual_entry(&mut self, source: &SourceConfig) -> Resolution {
        self.console
            .show(&format!("\n  Could not find a {} profile automatically", source.label));
        let prompt = format!(
            "  Please enter the {} profile URL (or 'skip' to skip): ",
            source.label
        );
        let input = match self.console.read_line(&prompt).await {
            Ok(Some(line)) => line.trim().to_string(),
            Ok(None) => String::new(),
            Err(e) => {
                warn!(error = %e, "Could not read manual URL");
                String::new()
            }
        };

        if input.is_empty() || input.eq_ignore_ascii_case("skip") {
            self.console.show(&format!("  Skipping {}", source.label));
            Resolution::Skipped
        } else {
            Resolution::Resolved(input)
        }
    }
}

/// Run a source's search and collect candidates in page order.
pub async fn search(
    page: &mut dyn Page,
    target_name: &str,
    spec: &SearchSpec,
    settle_delay: Duration,
) -> Result<Vec<Candidate>, BrowserError> {
    let search_url = spec.url(target_name);
    navigate_and_settle(page, &search_url, settle_delay).await?;
    let base = page
        .current_url()
        .and_then(|u| url::Url::parse(u).ok());

    let mut matches = page.find_all(&spec.candidate_selector)?;
    if let Some(limit) = spec.scan_limit {
        matches.truncate(limit);
    }

    let mut candidates = Vec::new();
    for element in &matches {
        if let Some(candidate) = to_candidate(page, element, spec, base.as_ref())? {
            candidates.push(candidate);
        }
    }
    info!(count = candidates.len(), url = %search_url, "Search candidates");
    Ok(candidates)
}

fn to_candidate(
    page: &dyn Page,
    element: &Element,
    spec: &SearchSpec,
    base: Option<&url::Url>,
) -> Result<Option<Candidate>, BrowserError> {
    let within = |selector: &Option<String>| -> Result<Option<Element>, BrowserError> {
        match selector {
            Some(selector) => element.find(selector),
            None => Ok(Some(element.clone())),
        }
    };

    let Some(link) = within(&spec.link_selector)? else {
        return Ok(None);
    };
    let Some(href) = link.attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    let url = match base.and_then(|b| b.join(href).ok()) {
        Some(resolved) => resolved.to_string(),
        None => href.to_string(),
    };

    if !spec.href_keywords.is_empty() {
        let lower = url.to_lowercase();
        if !spec.href_keywords.iter().any(|k| lower.contains(&k.to_lowercase())) {
            return Ok(None);
        }
    }

    let mut label = within(&spec.label_selector)?
        .map(|el| page.text(&el))
        .unwrap_or_default();
    if label.is_empty() {
        label = url.clone();
    }
    if let Some(max) = spec.label_max_chars {
        label = truncate(&label, max);
    }
    if let Some(detail) = spec
        .detail_selector
        .as_ref()
        .and_then(|selector| element.find(selector).ok().flatten())
        .map(|el| page.text(&el))
        .filter(|text| !text.is_empty())
    {
        label = format!("{label} - {detail}");
    }

    Ok(Some(Candidate { label, url }))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Browser;
    use crate::config::ResearchSettings;
    use crate::research::sources;
    use crate::testing::{FixtureBrowser, ScriptedConsole};

    const SEARCH: &str = "https://scholar.google.com/citations?view_op=search_authors&mauthors=Smith+Saint+Mary%27s+University&hl=en";

    fn settings() -> ResearchSettings {
        ResearchSettings {
            scholar_url: None,
            institution_url: None,
            affiliation: "Saint Mary's University".into(),
            city: "Halifax".into(),
            institution_domain: "smu.ca".into(),
            settle_delay: Duration::ZERO,
            chrome_bin: "chromium".into(),
        }
    }

    fn author_cards(n: usize) -> String {
        let cards: String = (1..=n)
            .map(|i| {
                format!(
                    r#"<div class="gs_ai_t">
                         <h3 class="gs_ai_name"><a href="/citations?user=u{i}">Smith {i}</a></h3>
                         <div class="gs_ai_aff">University {i}</div>
                       </div>"#
                )
            })
            .collect();
        format!("<html><body>{cards}</body></html>")
    }

    async fn resolve_with(html: Option<String>, inputs: &[&str]) -> (Resolution, ScriptedConsole) {
        let mut browser = FixtureBrowser::new();
        if let Some(html) = html {
            browser = browser.with_page(SEARCH, html);
        }
        let mut page = browser.open().await.unwrap();
        let mut console = ScriptedConsole::new(inputs);
        let source = sources::scholar(&settings());
        let resolution = ProfileResolver::new(&mut console, Duration::ZERO)
            .resolve(page.as_mut(), "Smith", &source)
            .await;
        (resolution, console)
    }

    #[test]
    fn menu_numbers_extras_after_candidates() {
        let menu = Menu {
            shown: 3,
            offer_manual: true,
            offer_skip: true,
        };
        assert_eq!(menu.parse("2"), MenuChoice::Candidate(1));
        assert_eq!(menu.parse(" 4 "), MenuChoice::Manual);
        assert_eq!(menu.parse("5"), MenuChoice::Skip);
        assert_eq!(menu.parse("0"), MenuChoice::Invalid);
        assert_eq!(menu.parse("99"), MenuChoice::Invalid);
        assert_eq!(menu.parse("two"), MenuChoice::Invalid);
    }

    #[test]
    fn skip_takes_manual_slot_when_manual_is_off() {
        let menu = Menu {
            shown: 2,
            offer_manual: false,
            offer_skip: true,
        };
        assert_eq!(menu.manual_index(), None);
        assert_eq!(menu.parse("3"), MenuChoice::Skip);
    }

    #[test]
    fn menu_caps_shown_candidates() {
        let spec = sources::scholar(&settings()).search;
        let menu = Menu::new(8, &spec);
        assert_eq!(menu.shown, MAX_MENU_CANDIDATES);
        assert_eq!(menu.manual_index(), Some(6));
        assert_eq!(menu.skip_index(), None);
    }

    #[tokio::test]
    async fn explicit_url_short_circuits_search() {
        let browser = FixtureBrowser::new();
        let mut page = browser.open().await.unwrap();
        let mut console = ScriptedConsole::new(&[]);
        let mut source = sources::scholar(&settings());
        source.explicit_url = Some("https://scholar.google.com/citations?user=known".into());

        let resolution = ProfileResolver::new(&mut console, Duration::ZERO)
            .resolve(page.as_mut(), "Smith", &source)
            .await;

        assert_eq!(
            resolution,
            Resolution::Resolved("https://scholar.google.com/citations?user=known".into())
        );
        assert!(browser.visited().is_empty());
    }

    #[tokio::test]
    async fn single_candidate_is_auto_selected() {
        let (resolution, console) = resolve_with(Some(author_cards(1)), &[]).await;
        assert_eq!(
            resolution,
            Resolution::Resolved("https://scholar.google.com/citations?user=u1".into())
        );
        assert!(console.transcript().contains("Auto-selected: Smith 1 - University 1"));
    }

    #[tokio::test]
    async fn numbered_choice_picks_that_candidate() {
        let (resolution, console) = resolve_with(Some(author_cards(3)), &["2"]).await;
        assert_eq!(
            resolution,
            Resolution::Resolved("https://scholar.google.com/citations?user=u2".into())
        );
        let transcript = console.transcript();
        assert!(transcript.contains("1. Smith 1 - University 1"));
        assert!(transcript.contains("4. None of these / Enter URL manually"));
    }

    #[tokio::test]
    async fn out_of_range_choice_falls_through_to_manual_entry() {
        let (resolution, console) = resolve_with(
            Some(author_cards(3)),
            &["99", "https://scholar.google.com/citations?user=typed"],
        )
        .await;
        assert_eq!(
            resolution,
            Resolution::Resolved("https://scholar.google.com/citations?user=typed".into())
        );
        assert!(console.prompts().iter().any(|p| p.contains("profile URL")));
    }

    #[tokio::test]
    async fn out_of_range_then_skip_is_skipped() {
        let (resolution, _) = resolve_with(Some(author_cards(3)), &["99", "SKIP"]).await;
        assert_eq!(resolution, Resolution::Skipped);
    }

    #[tokio::test]
    async fn no_candidates_prompts_for_manual_url() {
        let (resolution, _) = resolve_with(
            Some("<html><body>No results</body></html>".into()),
            &["https://scholar.google.com/citations?user=x"],
        )
        .await;
        assert_eq!(
            resolution,
            Resolution::Resolved("https://scholar.google.com/citations?user=x".into())
        );
    }

    #[tokio::test]
    async fn failed_search_degrades_to_manual_path() {
        // no fixture registered for the search URL, so navigation fails
        let (resolution, console) = resolve_with(None, &["skip"]).await;
        assert_eq!(resolution, Resolution::Skipped);
        assert!(console.transcript().contains("Search attempt failed"));
    }

    #[tokio::test]
    async fn closed_input_at_manual_prompt_skips() {
        let (resolution, _) = resolve_with(Some(author_cards(0)), &[]).await;
        assert_eq!(resolution, Resolution::Skipped);
    }

    #[tokio::test]
    async fn institution_menu_offers_skip_and_filters_links() {
        let search = "https://www.google.com/search?q=Smith+Saint+Mary%27s+University+Halifax+faculty+profile";
        let html = r#"<html><body>
            <a href="https://www.smu.ca/news/item">News</a>
            <a href="https://www.smu.ca/faculty/smith">Dr. Smith | Faculty</a>
            <a href="https://www.smu.ca/researcher/jsmith">J. Smith researcher page</a>
            <a href="https://elsewhere.org/faculty/smith">Elsewhere</a>
        </body></html>"#;
        let browser = FixtureBrowser::new().with_page(search, html);
        let mut page = browser.open().await.unwrap();
        let mut console = ScriptedConsole::new(&["4"]);
        let source = sources::institution(&settings());

        let resolution = ProfileResolver::new(&mut console, Duration::ZERO)
            .resolve(page.as_mut(), "Smith", &source)
            .await;

        assert_eq!(resolution, Resolution::Skipped);
        let transcript = console.transcript();
        assert!(transcript.contains("1. Dr. Smith | Faculty"));
        assert!(transcript.contains("2. J. Smith researcher page"));
        assert!(!transcript.contains("News"));
        assert!(transcript.contains("3. None of these / Enter URL manually"));
        assert!(transcript.contains("4. Skip"));
    }
}

//! Research aggregator: resolve and extract every source, one at a time.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tracing::{info, warn};

use crate::browser::Page;
use crate::channels::Console;
use crate::error::panic_message;

use super::extractor::Extractor;
use super::resolver::{ProfileResolver, Resolution};
use super::sources::SourceConfig;
use super::types::{ResearchContext, SourceResult};

/// Builds a [`ResearchContext`] from a list of sources.
#[derive(Debug, Clone)]
pub struct Aggregator {
    settle_delay: Duration,
    extractor: Extractor,
}

impl Aggregator {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            extractor: Extractor::new(settle_delay),
        }
    }

    /// Research `target_name` on each source in declared order.
    ///
    /// Every source gets exactly one entry; a failing source never stops the
    /// ones after it.
    pub async fn aggregate(
        &self,
        page: &mut dyn Page,
        console: &mut dyn Console,
        target_name: &str,
        sources: &[SourceConfig],
    ) -> ResearchContext {
        let mut context = ResearchContext::new();

        for source in sources {
            let attempt = self.research(&mut *page, &mut *console, target_name, source);
            let result = match AssertUnwindSafe(attempt).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(source = %source.name, error = %message, "Source research panicked");
                    SourceResult::error(message)
                }
            };

            match &result {
                SourceResult::Error { message } => {
                    console.show(&format!("  Error researching {}: {message}", source.label));
                }
                SourceResult::Data(_) => {
                    console.show(&format!("  {} research complete", source.label));
                }
                SourceResult::Skipped => {}
            }
            info!(source = %source.name, result = result.kind(), "Source researched");
            context.record(source.name.clone(), result);
        }

        context
    }

    async fn research(
        &self,
        page: &mut dyn Page,
        console: &mut dyn Console,
        target_name: &str,
        source: &SourceConfig,
    ) -> SourceResult {
        console.show(&format!("\nResearching {} profile...", source.label));

        let resolution = ProfileResolver::new(console, self.settle_delay)
            .resolve(page, target_name, source)
            .await;
        let url = match resolution {
            Resolution::Resolved(url) => url,
            Resolution::Skipped => return SourceResult::Skipped,
        };

        if let Err(e) = self.extractor.load(page, &url).await {
            warn!(source = %source.name, url = %url, error = %e, "Could not load profile");
            return SourceResult::error(e.to_string());
        }
        SourceResult::Data(self.extractor.extract(page, &source.fields, &url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Browser;
    use crate::config::ResearchSettings;
    use crate::research::sources;
    use crate::research::types::{INSTITUTION, SCHOLAR};
    use crate::testing::{FixtureBrowser, ScriptedConsole};

    const SCHOLAR_URL: &str = "https://scholar.google.com/citations?user=smith";
    const INSTITUTION_URL: &str = "https://www.smu.ca/profile/smith";

    const SCHOLAR_PAGE: &str = r#"<html><body>
        <a class="gsc_prf_inta">machine learning</a>
        <a class="gsc_prf_inta">robotics</a>
        <table><tr><td class="gsc_a_t">Learning to Grasp in Clutter</td></tr></table>
        <table><tr><td class="gsc_rsb_std">321</td></tr></table>
    </body></html>"#;

    const INSTITUTION_PAGE: &str = r#"<html><body>
        <h2>Research</h2>
        <p>Dr. Smith leads the robotics lab.</p>
    </body></html>"#;

    fn settings() -> ResearchSettings {
        ResearchSettings {
            scholar_url: Some(SCHOLAR_URL.into()),
            institution_url: Some(INSTITUTION_URL.into()),
            affiliation: "Saint Mary's University".into(),
            city: "Halifax".into(),
            institution_domain: "smu.ca".into(),
            settle_delay: Duration::ZERO,
            chrome_bin: "chromium".into(),
        }
    }

    async fn run(browser: &FixtureBrowser, sources: &[SourceConfig]) -> ResearchContext {
        let mut page = browser.open().await.unwrap();
        let mut console = ScriptedConsole::new(&[]);
        Aggregator::new(Duration::ZERO)
            .aggregate(page.as_mut(), &mut console, "Smith", sources)
            .await
    }

    #[tokio::test]
    async fn collects_both_sources_in_order() {
        let browser = FixtureBrowser::new()
            .with_page(SCHOLAR_URL, SCHOLAR_PAGE)
            .with_page(INSTITUTION_URL, INSTITUTION_PAGE);

        let context = run(&browser, &sources::default_sources(&settings())).await;

        assert_eq!(context.names(), vec![SCHOLAR, INSTITUTION]);
        let scholar = context.get(SCHOLAR).and_then(SourceResult::fields).unwrap();
        assert_eq!(scholar.phrases, vec!["machine learning", "robotics"]);
        assert_eq!(scholar.titles, vec!["Learning to Grasp in Clutter"]);
        assert_eq!(scholar.scalar.as_deref(), Some("321"));
        assert_eq!(scholar.url, SCHOLAR_URL);

        let institution = context.get(INSTITUTION).and_then(SourceResult::fields).unwrap();
        assert_eq!(institution.snippet.as_deref(), Some("Research"));
        assert!(institution.text_length.unwrap_or(0) > 0);
    }

    #[tokio::test]
    async fn failing_first_source_does_not_affect_second() {
        let browser = FixtureBrowser::new()
            .with_page(INSTITUTION_URL, INSTITUTION_PAGE)
            .failing(SCHOLAR_URL);

        let context = run(&browser, &sources::default_sources(&settings())).await;

        assert_eq!(context.names(), vec![SCHOLAR, INSTITUTION]);
        assert_eq!(context.get(SCHOLAR).map(SourceResult::kind), Some("error"));
        assert_eq!(context.get(INSTITUTION).map(SourceResult::kind), Some("data"));
    }

    #[tokio::test]
    async fn failing_second_source_keeps_first() {
        let browser = FixtureBrowser::new()
            .with_page(SCHOLAR_URL, SCHOLAR_PAGE)
            .failing(INSTITUTION_URL);

        let context = run(&browser, &sources::default_sources(&settings())).await;

        assert_eq!(context.get(SCHOLAR).map(SourceResult::kind), Some("data"));
        match context.get(INSTITUTION) {
            Some(SourceResult::Error { message }) => assert!(message.contains(INSTITUTION_URL)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_source_is_recorded_as_error() {
        let browser = FixtureBrowser::new()
            .with_page(INSTITUTION_URL, INSTITUTION_PAGE)
            .panicking(SCHOLAR_URL);

        let context = run(&browser, &sources::default_sources(&settings())).await;

        match context.get(SCHOLAR) {
            Some(SourceResult::Error { message }) => assert!(message.contains("fixture panic")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(context.get(INSTITUTION).map(SourceResult::kind), Some("data"));
    }

    #[tokio::test]
    async fn skipped_source_is_recorded() {
        let mut settings = settings();
        settings.institution_url = None;
        let browser = FixtureBrowser::new().with_page(SCHOLAR_URL, SCHOLAR_PAGE);
        let mut page = browser.open().await.unwrap();
        // institution search has no fixture, so it drops to manual entry
        let mut console = ScriptedConsole::new(&["skip"]);

        let context = Aggregator::new(Duration::ZERO)
            .aggregate(
                page.as_mut(),
                &mut console,
                "Smith",
                &sources::default_sources(&settings),
            )
            .await;

        assert_eq!(context.get(SCHOLAR).map(SourceResult::kind), Some("data"));
        assert_eq!(context.get(INSTITUTION), Some(&SourceResult::Skipped));
    }
}

//! End-to-end runs of the orchestrator against fixture pages, a scripted
//! console and a recording mailer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use scholar_outreach::agent::{ApprovalDecision, Orchestrator, OrchestratorDeps, RunOutcome, RunReport};
use scholar_outreach::compose::{SUBJECT, compose_template};
use scholar_outreach::config::AppConfig;
use scholar_outreach::dispatch::DispatchOutcome;
use scholar_outreach::error::MailError;
use scholar_outreach::llm::{LlmProvider, UnavailableProvider};
use scholar_outreach::research::{INSTITUTION, SCHOLAR, SourceResult};
use scholar_outreach::testing::{FixtureBrowser, RecordingMailer, ScriptedConsole, StubLlm};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const SCHOLAR_URL: &str = "https://scholar.google.com/citations?user=smith";
const INSTITUTION_URL: &str = "https://www.smu.ca/profile/smith";
const SCHOLAR_SEARCH: &str = "https://scholar.google.com/citations?view_op=search_authors&mauthors=Smith+Saint+Mary%27s+University&hl=en";

const SCHOLAR_PAGE: &str = r#"<html><body>
    <div id="gsc_prf_int">
      <a class="gsc_prf_inta">NLP</a>
      <a class="gsc_prf_inta">IR</a>
    </div>
    <table>
      <tr><td class="gsc_a_t">Neural Methods for X (2023)</td></tr>
      <tr><td class="gsc_a_t">Title</td></tr>
    </table>
    <table><tr><td class="gsc_rsb_std">1234</td></tr></table>
</body></html>"#;

const INSTITUTION_PAGE: &str = r#"<html><body>
    <h1>Dr. Smith</h1>
    <p>Biography: Dr. Smith works on language technology.</p>
</body></html>"#;

fn config(extra: &[(&'static str, &'static str)], without: &[&str]) -> AppConfig {
    let mut vars: HashMap<&str, &str> = [
        ("SENDER_EMAIL", "jane@example.com"),
        ("GMAIL_APP_PASSWORD", "app-pass"),
        ("YOUR_NAME", "Jane Doe"),
        ("YOUR_BACKGROUND", "I hold an MSc in CS."),
        ("TARGET_EMAIL", "smith@smu.ca"),
        ("PROFESSOR_NAME", "Smith"),
        ("GOOGLE_SCHOLAR_URL", SCHOLAR_URL),
        ("SMU_PROFILE_URL", INSTITUTION_URL),
        ("OUTREACH_SETTLE_MS", "0"),
    ]
    .into_iter()
    .collect();
    vars.extend(extra.iter().copied());
    for key in without {
        vars.remove(key);
    }
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

async fn run(
    config: AppConfig,
    browser: &FixtureBrowser,
    llm: Arc<dyn LlmProvider>,
    mailer: Arc<RecordingMailer>,
    console: &mut ScriptedConsole,
) -> RunReport {
    let orchestrator = Orchestrator::new(
        config,
        OrchestratorDeps {
            browser: Arc::new(browser.clone()),
            llm,
            mailer,
        },
    );
    let outcome = timeout(TEST_TIMEOUT, orchestrator.run(console))
        .await
        .expect("run timed out");
    match outcome {
        RunOutcome::Completed(report) => report,
        other => panic!("run did not complete: {other:?}"),
    }
}

#[tokio::test]
async fn delivery_failure_is_reported_and_browser_released() {
    let browser = FixtureBrowser::new()
        .with_page(SCHOLAR_URL, SCHOLAR_PAGE)
        .with_page(INSTITUTION_URL, INSTITUTION_PAGE);
    let mailer = Arc::new(RecordingMailer::failing(MailError::Auth("auth error".into())));
    let mut console = ScriptedConsole::new(&["", "yes"]);

    let report = run(
        config(&[], &[]),
        &browser,
        Arc::new(UnavailableProvider),
        mailer.clone(),
        &mut console,
    )
    .await;

    assert_eq!(report.decision, ApprovalDecision::Approved);
    assert_eq!(report.dispatch, Some(DispatchOutcome::Failed("auth error".into())));
    assert_eq!(mailer.attempts(), 1);
    assert_eq!(browser.open_count(), 1);
    assert_eq!(browser.close_count(), 1);

    let transcript = console.transcript();
    assert!(transcript.contains("Error sending email: auth error"));
    assert!(transcript.contains("Workflow completed!"));
    assert!(transcript.contains("Email: failed (auth error)"));
}

#[tokio::test]
async fn template_draft_carries_research_into_the_sent_mail() {
    let browser = FixtureBrowser::new()
        .with_page(SCHOLAR_URL, SCHOLAR_PAGE)
        .with_page(INSTITUTION_URL, INSTITUTION_PAGE);
    let mailer = Arc::new(RecordingMailer::new());
    let mut console = ScriptedConsole::new(&["", "yes"]);
    let config = config(&[], &[]);
    let profile = config.profile.clone();

    let report = run(
        config,
        &browser,
        Arc::new(UnavailableProvider),
        mailer.clone(),
        &mut console,
    )
    .await;

    assert_eq!(report.research.names(), vec![SCHOLAR, INSTITUTION]);
    let scholar = report.research.get(SCHOLAR).and_then(SourceResult::fields).unwrap();
    assert_eq!(scholar.scalar.as_deref(), Some("1234"));
    let institution = report
        .research
        .get(INSTITUTION)
        .and_then(SourceResult::fields)
        .unwrap();
    assert!(institution.snippet.as_deref().unwrap_or("").starts_with("Biography"));

    let expected = compose_template(&profile, &report.research);
    assert_eq!(report.draft, expected);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, "jane@example.com");
    assert_eq!(sent[0].to, "smith@smu.ca");
    assert_eq!(sent[0].subject, SUBJECT);
    assert!(sent[0].body.contains("I am particularly drawn to your work in NLP, IR."));
    assert!(sent[0].body.contains("\"Neural Methods for X (2023)\""));
    assert_eq!(report.dispatch, Some(DispatchOutcome::Sent));
}

#[tokio::test]
async fn search_pick_and_edit_flow() {
    let cards: String = (1..=3)
        .map(|i| {
            format!(
                r#"<div class="gs_ai_t"><h3 class="gs_ai_name"><a href="/citations?user=u{i}">J. Smith {i}</a></h3><div class="gs_ai_aff">Univ {i}</div></div>"#
            )
        })
        .collect();
    let browser = FixtureBrowser::new()
        .with_page(SCHOLAR_SEARCH, format!("<html><body>{cards}</body></html>"))
        .with_page("https://scholar.google.com/citations?user=u2", SCHOLAR_PAGE);
    let mailer = Arc::new(RecordingMailer::new());
    let mut console = ScriptedConsole::new(&[
        "",
        // scholar menu
        "2",
        // institution: search page missing, manual entry
        "skip",
        // approval gate
        "maybe",
        "edit",
        "Dear Professor Smith,",
        "",
        "Short and sweet.",
        "END",
        "YES",
    ]);

    let report = run(
        config(&[], &["GOOGLE_SCHOLAR_URL", "SMU_PROFILE_URL"]),
        &browser,
        Arc::new(UnavailableProvider),
        mailer.clone(),
        &mut console,
    )
    .await;

    let scholar = report.research.get(SCHOLAR).and_then(SourceResult::fields).unwrap();
    assert_eq!(scholar.url, "https://scholar.google.com/citations?user=u2");
    assert_eq!(report.research.get(INSTITUTION), Some(&SourceResult::Skipped));

    assert_eq!(report.decision, ApprovalDecision::Approved);
    assert_eq!(report.draft.body(), "Dear Professor Smith,\n\nShort and sweet.");
    assert_eq!(mailer.sent()[0].body, "Dear Professor Smith,\n\nShort and sweet.");
    assert_eq!(console.remaining(), 0);
    assert_eq!(browser.close_count(), 1);
}

#[tokio::test]
async fn model_written_draft_is_sent_verbatim() {
    let browser = FixtureBrowser::new()
        .with_page(SCHOLAR_URL, SCHOLAR_PAGE)
        .with_page(INSTITUTION_URL, INSTITUTION_PAGE);
    let mailer = Arc::new(RecordingMailer::new());
    let llm = Arc::new(StubLlm::replying(
        "Dear Professor Smith,\n\nYour NLP work is great.\n\nBest regards,\nJane Doe\n",
    ));
    let mut console = ScriptedConsole::new(&["", "yes"]);

    let report = run(
        config(&[("OPENAI_API_KEY", "sk-test")], &[]),
        &browser,
        llm.clone(),
        mailer.clone(),
        &mut console,
    )
    .await;

    assert_eq!(llm.calls(), 1);
    assert_eq!(
        mailer.sent()[0].body,
        "Dear Professor Smith,\n\nYour NLP work is great.\n\nBest regards,\nJane Doe"
    );
    assert_eq!(report.draft.subject(), SUBJECT);
    assert!(console.transcript().contains("OpenAI API: Enabled (will use gpt-4"));
}

#[tokio::test]
async fn every_source_failing_still_reaches_the_gate() {
    let browser = FixtureBrowser::new()
        .failing(SCHOLAR_URL)
        .failing(INSTITUTION_URL);
    let mailer = Arc::new(RecordingMailer::new());
    let llm = Arc::new(StubLlm::replying("unused"));
    let mut console = ScriptedConsole::new(&["", "no"]);

    let report = run(config(&[], &[]), &browser, llm.clone(), mailer.clone(), &mut console).await;

    assert_eq!(report.research.get(SCHOLAR).map(SourceResult::kind), Some("error"));
    assert_eq!(report.research.get(INSTITUTION).map(SourceResult::kind), Some("error"));
    assert_eq!(llm.calls(), 0);
    assert!(!report.draft.body().contains("particularly drawn"));
    assert_eq!(report.decision, ApprovalDecision::Rejected);
    assert_eq!(mailer.attempts(), 0);
    assert_eq!(browser.close_count(), 1);
}

//! Orchestrator: runs research, composition, approval and dispatch in order
//! and always releases the browser session.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::browser::{Browser, Page};
use crate::channels::Console;
use crate::compose::{Composer, Draft};
use crate::config::AppConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, MailTransport};
use crate::error::{Error, panic_message};
use crate::llm::LlmProvider;
use crate::research::{Aggregator, ResearchContext, SourceConfig, default_sources};

use super::approval::{ApprovalDecision, ApprovalGate};

const START_PROMPT: &str = "\nPress Enter to start, or Ctrl+C to cancel...";
const RULE_WIDTH: usize = 80;

/// Capabilities the orchestrator drives.
pub struct OrchestratorDeps {
    pub browser: Arc<dyn Browser>,
    pub llm: Arc<dyn LlmProvider>,
    pub mailer: Arc<dyn MailTransport>,
}

/// Workflow phase, for error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Startup,
    Research,
    Composition,
    Approval,
    Dispatch,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Startup => "startup",
            Self::Research => "research",
            Self::Composition => "composition",
            Self::Approval => "approval",
            Self::Dispatch => "dispatch",
        };
        f.write_str(name)
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub research: ResearchContext,
    /// The draft as approved or rejected.
    pub draft: Draft,
    pub decision: ApprovalDecision,
    /// `None` unless the draft was approved.
    pub dispatch: Option<DispatchOutcome>,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The operator declined to start; nothing was acquired.
    Cancelled,
    Completed(RunReport),
    /// A phase failed or panicked. Already reported to the operator.
    Aborted(Error),
}

/// Sequences the workflow phases.
pub struct Orchestrator {
    config: AppConfig,
    deps: OrchestratorDeps,
    sources: Vec<SourceConfig>,
}

impl Orchestrator {
    pub fn new(config: AppConfig, deps: OrchestratorDeps) -> Self {
        let sources = default_sources(&config.research);
        Self {
            config,
            deps,
            sources,
        }
    }

    /// Run the whole workflow once. Errors are reported on `console`, never raised.
    pub async fn run(&self, console: &mut dyn Console) -> RunOutcome {
        self.show_banner(console);
        match console.read_line(START_PROMPT).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                console.show("\n Cancelled before start.");
                return RunOutcome::Cancelled;
            }
            Err(e) => return self.abort(console, Phase::Startup, e.into()),
        }

        let rule = "=".repeat(RULE_WIDTH);
        console.show(" Starting PhD Email Orchestrator Agent");
        console.show(&rule);

        let mut page = match self.deps.browser.open().await {
            Ok(page) => page,
            Err(e) => return self.abort(console, Phase::Startup, e.into()),
        };

        let mut phase = Phase::Research;
        let result = AssertUnwindSafe(self.run_phases(page.as_mut(), &mut *console, &mut phase))
            .catch_unwind()
            .await;

        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close browser session");
        }
        console.show("\n Browser closed");

        match result {
            Ok(Ok(report)) => {
                console.show(&format!("\n{rule}"));
                console.show(" Workflow completed!");
                console.show(&format!(" {}", report.summary()));
                console.show(&rule);
                info!(decision = ?report.decision, "Workflow completed");
                RunOutcome::Completed(report)
            }
            Ok(Err(e)) => self.abort(console, phase, e),
            Err(payload) => {
                let error = Error::Panicked {
                    phase: phase.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                self.abort(console, phase, error)
            }
        }
    }

    async fn run_phases(
        &self,
        page: &mut dyn Page,
        console: &mut dyn Console,
        phase: &mut Phase,
    ) -> Result<RunReport, Error> {
        let profile = &self.config.profile;

        *phase = Phase::Research;
        let research = Aggregator::new(self.config.research.settle_delay)
            .aggregate(page, &mut *console, &profile.professor_name, &self.sources)
            .await;

        *phase = Phase::Composition;
        console.show("\n  Composing personalized email...");
        let draft = Composer::new(self.deps.llm.clone())
            .compose(profile, &research)
            .await;
        console.show(" Email drafted!");

        *phase = Phase::Approval;
        let reviewed = ApprovalGate::new(&mut *console)
            .review(draft, &research, &profile.recipient)
            .await?;

        let dispatch = match reviewed.decision {
            ApprovalDecision::Approved => {
                *phase = Phase::Dispatch;
                console.show("\n Sending email...");
                let outcome = Dispatcher::new(self.deps.mailer.clone())
                    .send(&reviewed.draft, &self.config.sender, &profile.recipient)
                    .await;
                match &outcome {
                    DispatchOutcome::Sent => console.show(" Email sent successfully!"),
                    DispatchOutcome::Failed(reason) => {
                        console.show(&format!(" Error sending email: {reason}"));
                    }
                }
                Some(outcome)
            }
            ApprovalDecision::Rejected => None,
        };

        Ok(RunReport {
            research,
            draft: reviewed.draft,
            decision: reviewed.decision,
            dispatch,
        })
    }

    fn show_banner(&self, console: &mut dyn Console) {
        console.show("\n  PhD Email Orchestrator Agent");
        console.show("  Research a professor, draft an email, send it after your approval.\n");
        console.show(&format!("Sender: {}", self.config.sender.address));
        console.show(&format!("Target: {}", self.config.profile.recipient));
        console.show(&format!("Professor: {}", self.config.profile.professor_name));
        console.show(&format!("Your Name: {}", self.config.profile.name));
        if self.config.model_enabled() {
            console.show(&format!(
                "OpenAI API: Enabled (will use {} for email generation)",
                self.config.model
            ));
        } else {
            console.show("OpenAI API: Not configured (will use template-based email)");
        }
    }

    fn abort(&self, console: &mut dyn Console, phase: Phase, error: Error) -> RunOutcome {
        error!(%phase, error = %error, "Workflow aborted");
        console.show(&format!("\n Workflow error: {error}"));
        RunOutcome::Aborted(error)
    }
}

impl RunReport {
    /// One-line summary for the completion report.
    pub fn summary(&self) -> String {
        let sources: Vec<String> = self
            .research
            .iter()
            .map(|(name, result)| format!("{name}={}", result.kind()))
            .collect();
        let delivery = match (&self.decision, &self.dispatch) {
            (ApprovalDecision::Rejected, _) => "not sent (rejected)".to_string(),
            (_, Some(DispatchOutcome::Sent)) => "sent".to_string(),
            (_, Some(DispatchOutcome::Failed(reason))) => format!("failed ({reason})"),
            (_, None) => "not sent".to_string(),
        };
        format!("Research: {} | Email: {delivery}", sources.join(", "))
    }
}

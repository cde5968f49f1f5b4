//! Approval gate: the operator approves, rejects or rewrites the draft
//! before anything is sent.
//!
//! The gate is a small state machine ([`GateState::advance`]) fed with
//! [`GateEvent`]s; [`ApprovalGate`] only translates console lines into events
//! and renders the screens.

use tracing::info;

use crate::channels::Console;
use crate::compose::Draft;
use crate::error::ConsoleError;
use crate::research::ResearchContext;

/// Line that ends an edited body.
pub const EDIT_SENTINEL: &str = "END";

const APPROVAL_PROMPT: &str = "\n Do you approve sending this email? (yes/no/edit): ";
const RULE_WIDTH: usize = 80;

/// Terminal value of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// Operator command at the approval prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalInput {
    Approve,
    Reject,
    Edit,
    Unrecognized,
}

impl ApprovalInput {
    /// Parse a prompt answer. Case-insensitive, surrounding whitespace ignored.
    pub fn parse(content: &str) -> Self {
        match content.trim().to_lowercase().as_str() {
            "yes" => Self::Approve,
            "no" => Self::Reject,
            "edit" => Self::Edit,
            _ => Self::Unrecognized,
        }
    }
}

/// Something the operator did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// One line of input.
    Line(String),
    /// Input is closed.
    EndOfInput,
}

/// Where the gate is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Presenting,
    Editing { lines: Vec<String> },
    Approved,
    Rejected,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    /// Nothing to do besides reading the next event.
    Continue,
    /// The answer was not understood; ask again.
    Reprompt,
    /// Editing started; ask for the new body.
    BeginEdit,
    /// Editing finished; the body becomes this text.
    ReplaceBody(String),
}

impl GateState {
    /// Apply one event. Terminal states absorb every event.
    pub fn advance(self, event: GateEvent) -> (GateState, GateAction) {
        match (self, event) {
            (Self::Presenting, GateEvent::Line(line)) => match ApprovalInput::parse(&line) {
                ApprovalInput::Approve => (Self::Approved, GateAction::Continue),
                ApprovalInput::Reject => (Self::Rejected, GateAction::Continue),
                ApprovalInput::Edit => (Self::Editing { lines: Vec::new() }, GateAction::BeginEdit),
                ApprovalInput::Unrecognized => (Self::Presenting, GateAction::Reprompt),
            },
            (Self::Presenting, GateEvent::EndOfInput) => (Self::Rejected, GateAction::Continue),
            (Self::Editing { lines }, GateEvent::Line(line))
                if line.trim_end_matches(['\r', '\n']) == EDIT_SENTINEL =>
            {
                (Self::Presenting, GateAction::ReplaceBody(lines.join("\n")))
            }
            (Self::Editing { mut lines }, GateEvent::Line(line)) => {
                lines.push(line);
                (Self::Editing { lines }, GateAction::Continue)
            }
            (Self::Editing { lines }, GateEvent::EndOfInput) => {
                (Self::Presenting, GateAction::ReplaceBody(lines.join("\n")))
            }
            (terminal, _) => (terminal, GateAction::Continue),
        }
    }

    pub fn decision(&self) -> Option<ApprovalDecision> {
        match self {
            Self::Approved => Some(ApprovalDecision::Approved),
            Self::Rejected => Some(ApprovalDecision::Rejected),
            _ => None,
        }
    }
}

/// The gate's result: the decision and the draft as it stood when it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewed {
    pub decision: ApprovalDecision,
    pub draft: Draft,
}

/// Runs the approval loop on a console.
pub struct ApprovalGate<'a> {
    console: &'a mut dyn Console,
}

impl<'a> ApprovalGate<'a> {
    pub fn new(console: &'a mut dyn Console) -> Self {
        Self { console }
    }

    /// Present `draft` and loop until the operator approves or rejects.
    ///
    /// Only a console read failure is an error; closed input rejects.
    pub async fn review(
        &mut self,
        mut draft: Draft,
        context: &ResearchContext,
        recipient: &str,
    ) -> Result<Reviewed, ConsoleError> {
        self.present(&draft, context, recipient);

        let mut state = GateState::Presenting;
        loop {
            if let Some(decision) = state.decision() {
                match decision {
                    ApprovalDecision::Approved => self.console.show(" Email approved for sending!"),
                    ApprovalDecision::Rejected => self.console.show(" Email sending cancelled."),
                }
                info!(?decision, "Approval gate finished");
                return Ok(Reviewed { decision, draft });
            }

            let prompt = match state {
                GateState::Presenting => APPROVAL_PROMPT,
                _ => "",
            };
            let event = match self.console.read_line(prompt).await? {
                Some(line) => GateEvent::Line(line),
                None => GateEvent::EndOfInput,
            };

            let (next, action) = state.advance(event);
            state = next;
            match action {
                GateAction::Continue => {}
                GateAction::Reprompt => self.console.show("  Please enter 'yes', 'no', or 'edit'"),
                GateAction::BeginEdit => self.console.show(&format!(
                    "\n  Enter your edited email body (type '{EDIT_SENTINEL}' on a new line when done):"
                )),
                GateAction::ReplaceBody(body) => {
                    draft.replace_body(body);
                    self.show_updated(&draft);
                }
            }
        }
    }

    fn present(&mut self, draft: &Draft, context: &ResearchContext, recipient: &str) {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        self.console.show(&format!("\n{heavy}"));
        self.console.show(" DRAFTED EMAIL FOR YOUR APPROVAL");
        self.console.show(&heavy);
        self.console.show("\n RESEARCH SUMMARY:");
        self.console.show(&context.to_pretty_json());
        self.console.show(&format!("\n{light}"));
        self.console.show(&format!("SUBJECT: {}", draft.subject()));
        self.console.show(&light);
        self.console.show(draft.body());
        self.console.show(&light);
        self.console
            .show(&format!("\n This email will be sent to: {recipient}"));
    }

    fn show_updated(&mut self, draft: &Draft) {
        let light = "-".repeat(RULE_WIDTH);
        self.console.show(&format!("\n{light}"));
        self.console.show("UPDATED EMAIL:");
        self.console.show(draft.body());
        self.console.show(&light);
    }
}

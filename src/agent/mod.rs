//! Agent module: the approval gate and the orchestrator that drives a run.

pub mod approval;
pub mod orchestrator;

pub use approval::{ApprovalDecision, ApprovalGate, ApprovalInput, GateEvent, GateState, Reviewed};
pub use orchestrator::{Orchestrator, OrchestratorDeps, Phase, RunOutcome, RunReport};

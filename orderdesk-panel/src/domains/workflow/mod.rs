//! Long-running server workflows: start, poll to a terminal state, report.

pub mod orchestrator;
pub mod outcome;

pub use orchestrator::{
    OrchestratorSettings, WorkflowHandle, WorkflowOrchestrator, WorkflowTicket,
};
pub use outcome::{
    JobKind, WorkflowError, WorkflowJob, WorkflowOutcome, WorkflowReport,
};

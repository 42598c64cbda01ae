//! Step tracking for the publish workflow
//!
//! The workflow is strictly linear. The tracker records which step was
//! entered when, so the report can show how far a failed run got. Nothing is
//! persisted; a failed run is simply re-run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Workflow step, in execution order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStep {
    Initial,
    CheckingConfig,
    CheckingTool,
    CheckingIdentity,
    Initializing,
    Staging,
    GuardingSecrets,
    Committing,
    Branching,
    RegisteringRemote,
    Pushing,
    Published,
    Failed,
}

impl WorkflowStep {
    /// Check whether the step changes the working directory or git config
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Initializing
                | Self::Staging
                | Self::Committing
                | Self::Branching
                | Self::RegisteringRemote
                | Self::Pushing
        )
    }
}

/// Step transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepTransition {
    pub from: WorkflowStep,
    pub to: WorkflowStep,
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// In-memory record of one workflow run
#[derive(Debug, Clone)]
pub struct WorkflowTracker {
    current: WorkflowStep,
    transitions: Vec<StepTransition>,
}

impl Default for WorkflowTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowTracker {
    pub fn new() -> Self {
        Self {
            current: WorkflowStep::Initial,
            transitions: Vec::new(),
        }
    }

    /// Enter a new step
    pub fn transition(&mut self, to: WorkflowStep, note: Option<String>) {
        info!(from = ?self.current, to = ?to, "workflow step");

        self.transitions.push(StepTransition {
            from: self.current,
            to,
            timestamp: Utc::now(),
            note,
        });
        self.current = to;
    }

    /// Mark the run failed, remembering the step it failed in
    pub fn fail(&mut self, reason: &str) {
        let failed_in = self.current;
        self.transition(
            WorkflowStep::Failed,
            Some(format!("{:?}: {}", failed_in, reason)),
        );
    }

    pub fn current(&self) -> WorkflowStep {
        self.current
    }

    pub fn transitions(&self) -> &[StepTransition] {
        &self.transitions
    }

    /// Step the run was in before it failed, if it failed
    pub fn failed_step(&self) -> Option<WorkflowStep> {
        self.transitions
            .iter()
            .rev()
            .find(|t| t.to == WorkflowStep::Failed)
            .map(|t| t.from)
    }

    /// Check whether any mutating step was entered
    pub fn mutated(&self) -> bool {
        self.transitions.iter().any(|t| t.to.is_mutating())
    }

    /// Transition history as human-readable string
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let note = t
                    .note
                    .as_ref()
                    .map(|n| format!(" ({})", n))
                    .unwrap_or_default();
                format!(
                    "{}: {:?} → {:?}{}",
                    t.timestamp.to_rfc3339(),
                    t.from,
                    t.to,
                    note
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

//! Moderation state machine: the lifecycle transition table and the
//! validation that runs before any transition leaves the client.
//!
//! Who may trigger a transition is the policy table's concern; this module
//! only answers whether a (from-state, action) pair is legal. Resubmission is
//! deliberately absent from the table: editing a `rejected` listing folds the
//! rejected→pending move into the update itself (see the session).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::LifecycleStatus;
use super::policy::Action;
use super::session::WorkflowError;

/// Lifecycle transitions a caller can request explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Approve,
    Reject,
    Unpublish,
    Republish,
}

impl TransitionAction {
    pub const fn label(self) -> &'static str {
        match self {
            TransitionAction::Approve => "approve",
            TransitionAction::Reject => "reject",
            TransitionAction::Unpublish => "unpublish",
            TransitionAction::Republish => "republish",
        }
    }

    /// The permission-gate action this transition requires.
    pub const fn as_action(self) -> Action {
        match self {
            TransitionAction::Approve => Action::Approve,
            TransitionAction::Reject => Action::Reject,
            TransitionAction::Unpublish => Action::Unpublish,
            TransitionAction::Republish => Action::Republish,
        }
    }

    /// Publish/suspend toggles flip the local entry before the server
    /// confirms; approval and rejection fan out to other viewers and wait.
    pub const fn is_optimistic(self) -> bool {
        matches!(self, TransitionAction::Unpublish | TransitionAction::Republish)
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TransitionAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            // "verify" is the service catalogue's historical name for
            // approval; one code path serves both.
            "approve" | "verify" => Ok(TransitionAction::Approve),
            "reject" => Ok(TransitionAction::Reject),
            "unpublish" => Ok(TransitionAction::Unpublish),
            "republish" => Ok(TransitionAction::Republish),
            other => Err(format!("unknown transition action: {other}")),
        }
    }
}

/// The transition table. `None` means the pair is illegal.
pub const fn next_status(
    from: LifecycleStatus,
    action: TransitionAction,
) -> Option<LifecycleStatus> {
    match (from, action) {
        (LifecycleStatus::Pending, TransitionAction::Approve) => Some(LifecycleStatus::Approved),
        (LifecycleStatus::Pending, TransitionAction::Reject) => Some(LifecycleStatus::Rejected),
        (LifecycleStatus::Approved, TransitionAction::Unpublish) => {
            Some(LifecycleStatus::Suspended)
        }
        (LifecycleStatus::Suspended, TransitionAction::Republish) => {
            Some(LifecycleStatus::Approved)
        }
        _ => None,
    }
}

/// Resolve the target status or reject the request, with no side effect.
///
/// Legality must always be derived from the engine's latest known status,
/// never from state the caller carried along.
pub fn plan(
    from: LifecycleStatus,
    action: TransitionAction,
) -> Result<LifecycleStatus, WorkflowError> {
    next_status(from, action).ok_or(WorkflowError::IllegalTransition { from, action })
}

/// A rejection must carry a non-empty reason; checked before any network call.
pub fn validate_rejection_reason(reason: &str) -> Result<(), WorkflowError> {
    if reason.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "rejection reason must not be empty".to_string(),
        ));
    }
    Ok(())
}

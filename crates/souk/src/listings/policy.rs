//! Role policy table: which scope a role fetches by default and which actions
//! it may take on a given listing. Pure lookups, no side effects; unknown
//! roles fail closed.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::{Actor, ListingRecord, ResourceKind, Role};
use super::scope::Scope;

/// Every mutation the engine knows how to gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Edit,
    Delete,
    Approve,
    Reject,
    Unpublish,
    Republish,
    Save,
    Unsave,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Unpublish => "unpublish",
            Action::Republish => "republish",
            Action::Save => "save",
            Action::Unsave => "unsave",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "edit" => Ok(Action::Edit),
            "delete" => Ok(Action::Delete),
            // The service catalogue historically called its approval action
            // "verify"; both catalogues now share one approve path and the
            // synonym survives only here at the parse boundary.
            "approve" | "verify" => Ok(Action::Approve),
            "reject" => Ok(Action::Reject),
            "unpublish" => Ok(Action::Unpublish),
            "republish" => Ok(Action::Republish),
            "save" => Ok(Action::Save),
            "unsave" => Ok(Action::Unsave),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// Default fetch scope per role. `Mine` is the safest answer for roles the
/// table does not recognize: it can only ever show a caller their own rows.
pub const fn default_scope(role: Role) -> Scope {
    match role {
        Role::Seeker => Scope::AllApproved,
        Role::Landlord | Role::Agent | Role::Provider => Scope::Mine,
        Role::Moderator => Scope::PendingOnly,
        Role::Guest => Scope::Mine,
    }
}

/// Whether a role may create listings in the given catalogue.
pub fn may_create(role: Role, kind: ResourceKind) -> bool {
    match role {
        Role::Moderator => true,
        _ => role.creator_kind() == Some(kind),
    }
}

/// Full action set the actor holds on this record.
///
/// Moderators moderate and manage every listing but never hold the seeker's
/// save affordance; creators manage only listings they own in their own
/// catalogue; seekers only bookmark; guests get nothing.
pub fn allowed_actions(actor: &Actor, record: &ListingRecord) -> BTreeSet<Action> {
    let mut actions = BTreeSet::new();

    match actor.role {
        Role::Moderator => {
            actions.extend([
                Action::Create,
                Action::Edit,
                Action::Delete,
                Action::Approve,
                Action::Reject,
                Action::Unpublish,
                Action::Republish,
            ]);
        }
        Role::Landlord | Role::Agent | Role::Provider => {
            if actor.role.creator_kind() == Some(record.kind) {
                actions.insert(Action::Create);
                if actor.owns(record) {
                    actions.extend([
                        Action::Edit,
                        Action::Delete,
                        Action::Unpublish,
                        Action::Republish,
                    ]);
                }
            }
        }
        Role::Seeker => {
            actions.extend([Action::Save, Action::Unsave]);
        }
        Role::Guest => {}
    }

    actions
}

pub fn may(actor: &Actor, action: Action, record: &ListingRecord) -> bool {
    allowed_actions(actor, record).contains(&action)
}

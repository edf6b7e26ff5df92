//! Scope resolution: from (role, requested view/tab) to the concrete fetch
//! instruction, plus the post-fetch admission predicate that keeps the stored
//! list role-correct even when the backend answers with a dirty superset.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{Actor, LifecycleStatus, ListingRecord, Role, UserId};

/// View axis used by creator and moderator roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatorView {
    Mine,
    All,
    Pending,
}

impl CreatorView {
    pub const fn label(self) -> &'static str {
        match self {
            CreatorView::Mine => "mine",
            CreatorView::All => "all",
            CreatorView::Pending => "pending",
        }
    }
}

/// Tab axis used by the seeker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekerTab {
    Active,
    Saved,
}

impl SeekerTab {
    pub const fn label(self) -> &'static str {
        match self {
            SeekerTab::Active => "active",
            SeekerTab::Saved => "saved",
        }
    }
}

/// Two-axis UI selector. Exactly one axis is meaningful per role; the
/// resolver falls back to the role default when handed the wrong axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSelector {
    View(CreatorView),
    Tab(SeekerTab),
}

impl ViewSelector {
    /// Canonical query pair for redirect URLs, e.g. `("view", "mine")`.
    pub const fn query_pair(self) -> (&'static str, &'static str) {
        match self {
            ViewSelector::View(view) => ("view", view.label()),
            ViewSelector::Tab(tab) => ("tab", tab.label()),
        }
    }
}

/// Opaque fetch instruction handed to the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Mine,
    AllApproved,
    PendingOnly,
    SavedSubset,
}

impl Scope {
    pub const fn label(self) -> &'static str {
        match self {
            Scope::Mine => "mine",
            Scope::AllApproved => "all_approved",
            Scope::PendingOnly => "pending_only",
            Scope::SavedSubset => "saved_subset",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of scope resolution. `redirected` signals the caller to make the
/// canonical selector explicit in its own address state; resolving again with
/// that selector yields the same scope with `redirected == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeResolution {
    pub scope: Scope,
    pub selector: ViewSelector,
    pub redirected: bool,
}

/// Canonical default selector per role.
pub fn default_selector(role: Role) -> ViewSelector {
    match role {
        Role::Seeker => ViewSelector::Tab(SeekerTab::Active),
        Role::Landlord | Role::Agent | Role::Provider => ViewSelector::View(CreatorView::Mine),
        Role::Moderator => ViewSelector::View(CreatorView::Pending),
        Role::Guest => ViewSelector::View(CreatorView::Mine),
    }
}

fn axis_matches(role: Role, selector: ViewSelector) -> bool {
    match (role, selector) {
        (Role::Seeker, ViewSelector::Tab(_)) => true,
        (Role::Landlord | Role::Agent | Role::Provider | Role::Moderator, ViewSelector::View(_)) => {
            true
        }
        _ => false,
    }
}

fn scope_for(selector: ViewSelector) -> Scope {
    match selector {
        ViewSelector::Tab(SeekerTab::Active) => Scope::AllApproved,
        ViewSelector::Tab(SeekerTab::Saved) => Scope::SavedSubset,
        ViewSelector::View(CreatorView::Mine) => Scope::Mine,
        ViewSelector::View(CreatorView::All) => Scope::AllApproved,
        ViewSelector::View(CreatorView::Pending) => Scope::PendingOnly,
    }
}

/// Resolve a requested selector against the role's policy.
///
/// A missing selector, or one on the axis the role does not use, canonicalizes
/// to the role default instead of erroring: stale request state must never
/// produce an empty result by surprise.
pub fn resolve(role: Role, requested: Option<ViewSelector>) -> ScopeResolution {
    let (selector, redirected) = match requested {
        Some(selector) if axis_matches(role, selector) => (selector, false),
        Some(_) | None => (default_selector(role), true),
    };

    ScopeResolution {
        scope: scope_for(selector),
        selector,
        redirected,
    }
}

/// Owner restriction for the fetch call, if the scope implies one.
///
/// `PendingOnly` without an owner restriction is the moderator review queue;
/// any other role asking for pending listings only ever sees its own.
pub fn owner_param(scope: Scope, actor: &Actor) -> Option<&UserId> {
    match scope {
        Scope::Mine => Some(&actor.user_id),
        Scope::PendingOnly if actor.role != Role::Moderator => Some(&actor.user_id),
        _ => None,
    }
}

/// Post-fetch admission check applied to every record before it enters the
/// session list.
///
/// `AllApproved` must never admit `pending`, `rejected`, or `suspended`
/// records for non-moderator roles; a moderator viewing `all` bypasses the
/// exclusion entirely. `owner_sees_suspended` is the per-deployment knob that
/// lets owning creators keep sight of their suspended listings there.
pub fn scope_admits(
    scope: Scope,
    actor: &Actor,
    record: &ListingRecord,
    owner_sees_suspended: bool,
) -> bool {
    match scope {
        Scope::Mine => actor.owns(record),
        Scope::PendingOnly => {
            record.status == LifecycleStatus::Pending
                && (actor.role == Role::Moderator || actor.owns(record))
        }
        Scope::AllApproved => {
            if actor.role == Role::Moderator {
                return true;
            }
            match record.status {
                LifecycleStatus::Approved => true,
                LifecycleStatus::Suspended => owner_sees_suspended && actor.owns(record),
                LifecycleStatus::Pending | LifecycleStatus::Rejected => false,
            }
        }
        Scope::SavedSubset => record.status == LifecycleStatus::Approved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::policy;

    #[test]
    fn missing_selector_resolves_to_role_default_and_signals_redirect() {
        let first = resolve(Role::Seeker, None);
        assert_eq!(first.scope, Scope::AllApproved);
        assert_eq!(first.selector, ViewSelector::Tab(SeekerTab::Active));
        assert!(first.redirected);

        let second = resolve(Role::Seeker, Some(first.selector));
        assert_eq!(second.scope, first.scope);
        assert!(!second.redirected);
    }

    #[test]
    fn resolution_is_idempotent_for_every_role() {
        for role in [
            Role::Guest,
            Role::Seeker,
            Role::Landlord,
            Role::Agent,
            Role::Provider,
            Role::Moderator,
        ] {
            let first = resolve(role, None);
            let second = resolve(role, Some(first.selector));
            assert_eq!(second.scope, first.scope, "role {role}");
            assert!(!second.redirected, "role {role}");
            assert_eq!(first.scope, policy::default_scope(role), "role {role}");
        }
    }

    #[test]
    fn wrong_axis_falls_back_instead_of_erroring() {
        let resolution = resolve(Role::Seeker, Some(ViewSelector::View(CreatorView::Mine)));
        assert_eq!(resolution.selector, ViewSelector::Tab(SeekerTab::Active));
        assert!(resolution.redirected);

        let resolution = resolve(Role::Landlord, Some(ViewSelector::Tab(SeekerTab::Saved)));
        assert_eq!(resolution.selector, ViewSelector::View(CreatorView::Mine));
        assert_eq!(resolution.scope, Scope::Mine);
        assert!(resolution.redirected);
    }

    #[test]
    fn moderator_pending_is_the_unrestricted_review_queue() {
        let moderator = Actor::new("mod-1", Role::Moderator);
        let resolution = resolve(Role::Moderator, Some(ViewSelector::View(CreatorView::Pending)));
        assert_eq!(resolution.scope, Scope::PendingOnly);
        assert_eq!(owner_param(resolution.scope, &moderator), None);

        let landlord = Actor::new("owner-1", Role::Landlord);
        assert_eq!(
            owner_param(Scope::PendingOnly, &landlord),
            Some(&landlord.user_id)
        );
    }

    fn record(owner: &str, status: LifecycleStatus) -> ListingRecord {
        crate::listings::test_support::record("p-1", owner, status)
    }

    #[test]
    fn all_approved_excludes_unpublished_states_for_non_moderators() {
        let seeker = Actor::new("u-1", Role::Seeker);
        assert!(scope_admits(
            Scope::AllApproved,
            &seeker,
            &record("owner-1", LifecycleStatus::Approved),
            false
        ));
        for status in [
            LifecycleStatus::Pending,
            LifecycleStatus::Rejected,
            LifecycleStatus::Suspended,
        ] {
            assert!(!scope_admits(
                Scope::AllApproved,
                &seeker,
                &record("owner-1", status),
                false
            ));
        }
    }

    #[test]
    fn moderator_all_bypasses_the_exclusion() {
        let moderator = Actor::new("mod-1", Role::Moderator);
        for status in [
            LifecycleStatus::Pending,
            LifecycleStatus::Approved,
            LifecycleStatus::Rejected,
            LifecycleStatus::Suspended,
        ] {
            assert!(scope_admits(
                Scope::AllApproved,
                &moderator,
                &record("owner-1", status),
                false
            ));
        }
    }

    #[test]
    fn suspended_visibility_for_owners_is_a_deployment_knob() {
        let owner = Actor::new("owner-1", Role::Landlord);
        let suspended = record("owner-1", LifecycleStatus::Suspended);
        assert!(!scope_admits(Scope::AllApproved, &owner, &suspended, false));
        assert!(scope_admits(Scope::AllApproved, &owner, &suspended, true));

        let stranger = Actor::new("owner-2", Role::Landlord);
        assert!(!scope_admits(Scope::AllApproved, &stranger, &suspended, true));
    }
}

//! Mutation coordinator. A [`ListingSession`] owns one actor's view of one
//! catalogue: the resolved scope, the fetched list, the local filter state,
//! and the disciplines that keep them coherent: per-listing mutation gates,
//! the optimistic toggle protocol, and the fetch epoch that discards results
//! arriving for an abandoned scope.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::bookmarks::BookmarkStore;
use super::directory::{DirectoryError, ListingDirectory, PageRequest, Pagination};
use super::domain::{
    Actor, LifecycleStatus, ListingDraft, ListingId, ListingPatch, ListingRecord, ResourceKind,
    Role,
};
use super::filter::{self, FilterState};
use super::lifecycle::{self, TransitionAction};
use super::optimistic::Optimistic;
use super::policy::{self, Action};
use super::scope::{self, Scope, ScopeResolution, ViewSelector};

/// Engine error taxonomy. The first three variants are local validations and
/// never reach the network; directory failures arrive with any optimistic
/// change already rolled back. None of these are fatal to the host.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("role {role} may not {action}")]
    Forbidden { role: Role, action: Action },
    #[error("cannot {action} a {from} listing")]
    IllegalTransition {
        from: LifecycleStatus,
        action: TransitionAction,
    },
    #[error("listing {0} not found")]
    NotFound(ListingId),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Per-deployment knobs threaded into every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub page_size: u32,
    /// Whether owning creators keep sight of their suspended listings in the
    /// `all` view.
    pub owner_sees_suspended: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            owner_sees_suspended: false,
        }
    }
}

struct SessionState {
    resolution: ScopeResolution,
    page: u32,
    items: Vec<ListingRecord>,
    pagination: Option<Pagination>,
    filters: FilterState,
}

/// One actor's live view of one catalogue.
///
/// The session is the single owner of its mutable state; the list lives under
/// a short-lived mutex never held across an await, and same-listing mutations
/// queue on a per-id async gate while different listings proceed
/// independently.
pub struct ListingSession<D> {
    directory: Arc<D>,
    bookmarks: Arc<BookmarkStore>,
    actor: Actor,
    kind: ResourceKind,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    epoch: AtomicU64,
    /// Gates accumulate per mutated listing id and are never dropped; the
    /// map is bounded by the ids this actor touches, not by the catalogue.
    gates: Mutex<HashMap<ListingId, Arc<AsyncMutex<()>>>>,
}

impl<D> ListingSession<D>
where
    D: ListingDirectory,
{
    pub fn new(
        directory: Arc<D>,
        bookmarks: Arc<BookmarkStore>,
        actor: Actor,
        kind: ResourceKind,
        settings: SessionSettings,
    ) -> Self {
        let resolution = scope::resolve(actor.role, None);
        Self {
            directory,
            bookmarks,
            actor,
            kind,
            settings,
            state: Mutex::new(SessionState {
                resolution,
                page: 1,
                items: Vec::new(),
                pagination: None,
                filters: FilterState::default(),
            }),
            epoch: AtomicU64::new(0),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Resolve a requested view/tab, make it current, and fetch its first
    /// page. Switching scope bumps the fetch epoch, so a late result for the
    /// previous scope is discarded instead of overwriting this one.
    pub async fn open(
        &self,
        requested: Option<ViewSelector>,
    ) -> Result<ScopeResolution, WorkflowError> {
        let resolution = scope::resolve(self.actor.role, requested);
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.lock_state();
            state.resolution = resolution;
            state.page = 1;
        }
        self.fetch_into(resolution.scope, 1, epoch).await?;
        Ok(resolution)
    }

    /// Refetch the current scope and page.
    pub async fn refresh(&self) -> Result<(), WorkflowError> {
        let (scope, page, epoch) = self.issue_point();
        self.fetch_into(scope, page, epoch).await
    }

    /// Move to another page of the current scope.
    pub async fn goto_page(&self, page: u32) -> Result<(), WorkflowError> {
        let page = page.max(1);
        let (scope, epoch) = {
            let mut state = self.lock_state();
            state.page = page;
            (state.resolution.scope, self.epoch.load(Ordering::SeqCst))
        };
        self.fetch_into(scope, page, epoch).await
    }

    pub fn resolution(&self) -> ScopeResolution {
        self.lock_state().resolution
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.lock_state().pagination
    }

    pub fn set_filters(&self, filters: FilterState) {
        self.lock_state().filters = filters;
    }

    pub fn filters(&self) -> FilterState {
        self.lock_state().filters.clone()
    }

    /// The raw admitted list, before local filters.
    pub fn snapshot(&self) -> Vec<ListingRecord> {
        self.lock_state().items.clone()
    }

    /// The display list: local filters applied over the admitted list, with
    /// the saved-only filter forced while the saved tab's scope is current.
    pub fn visible(&self) -> Vec<ListingRecord> {
        let (items, mut filters, scope) = {
            let state = self.lock_state();
            (
                state.items.clone(),
                state.filters.clone(),
                state.resolution.scope,
            )
        };
        if scope == Scope::SavedSubset {
            filters.saved_only = true;
        }
        filter::apply(&items, &filters, &self.bookmarks.list())
    }

    /// Last-known record for `id`, falling back to a directory fetch.
    pub async fn lookup(&self, id: &ListingId) -> Result<ListingRecord, WorkflowError> {
        if let Some(record) = self.known(id) {
            return Ok(record);
        }
        match self.directory.get(self.kind, id).await {
            Ok(record) => Ok(record),
            Err(DirectoryError::NotFound) => Err(WorkflowError::NotFound(id.clone())),
            Err(other) => Err(other.into()),
        }
    }

    /// Create a listing. Server-confirmed: the new record enters the list
    /// via the reconciling refetch, never by local guesswork.
    pub async fn create(&self, draft: ListingDraft) -> Result<ListingRecord, WorkflowError> {
        if !policy::may_create(self.actor.role, self.kind) {
            return Err(self.forbidden(Action::Create));
        }
        let issued = self.issue_point();
        let record = self
            .directory
            .create(self.kind, &self.actor.user_id, draft)
            .await?;
        info!(listing = %record.id, kind = %self.kind, "listing created");
        self.reconcile(issued).await;
        Ok(record)
    }

    /// Edit a listing. Editing a `rejected` listing folds the
    /// rejected→pending resubmission into the same update call; no separate
    /// resubmit action exists.
    pub async fn update(
        &self,
        id: &ListingId,
        mut patch: ListingPatch,
    ) -> Result<ListingRecord, WorkflowError> {
        let gate = self.gate(id);
        let _held = gate.lock().await;

        let current = self.lookup(id).await?;
        self.authorize(Action::Edit, &current)?;
        if current.status == LifecycleStatus::Rejected {
            patch.resubmit = true;
            info!(listing = %id, "edit of rejected listing resubmits it for review");
        }

        let issued = self.issue_point();
        let record = match self.directory.update(self.kind, id, patch).await {
            Ok(record) => record,
            Err(DirectoryError::NotFound) => return Err(WorkflowError::NotFound(id.clone())),
            Err(other) => return Err(other.into()),
        };
        self.replace_entry(&record);
        self.reconcile(issued).await;
        Ok(record)
    }

    /// Delete a listing. Ownership-gated and independent of lifecycle state;
    /// waits for server confirmation before the entry leaves the list.
    pub async fn delete(&self, id: &ListingId) -> Result<(), WorkflowError> {
        let gate = self.gate(id);
        let _held = gate.lock().await;

        let current = self.lookup(id).await?;
        self.authorize(Action::Delete, &current)?;

        let issued = self.issue_point();
        match self.directory.delete(self.kind, id).await {
            Ok(()) => {}
            Err(DirectoryError::NotFound) => return Err(WorkflowError::NotFound(id.clone())),
            Err(other) => return Err(other.into()),
        }
        info!(listing = %id, "listing deleted");
        self.remove_entry(id);
        self.reconcile(issued).await;
        Ok(())
    }

    /// Approve a pending listing. Not optimistic: approval fans out to every
    /// other viewer, so the list waits for the confirmed record.
    pub async fn approve(&self, id: &ListingId) -> Result<ListingRecord, WorkflowError> {
        self.confirmed_transition(id, TransitionAction::Approve, None)
            .await
    }

    /// Reject a pending listing with a reason. The reason is validated before
    /// anything touches the network.
    pub async fn reject(
        &self,
        id: &ListingId,
        reason: &str,
    ) -> Result<ListingRecord, WorkflowError> {
        lifecycle::validate_rejection_reason(reason)?;
        self.confirmed_transition(id, TransitionAction::Reject, Some(reason))
            .await
    }

    /// Take an approved listing off the public surface. Optimistic.
    pub async fn unpublish(&self, id: &ListingId) -> Result<ListingRecord, WorkflowError> {
        self.optimistic_transition(id, TransitionAction::Unpublish)
            .await
    }

    /// Put a suspended listing back on the public surface. Optimistic.
    pub async fn republish(&self, id: &ListingId) -> Result<ListingRecord, WorkflowError> {
        self.optimistic_transition(id, TransitionAction::Republish)
            .await
    }

    /// Flip the saved marker for a listing. Seeker-only.
    pub async fn toggle_saved(&self, id: &ListingId) -> Result<bool, WorkflowError> {
        if self.actor.role != Role::Seeker {
            return Err(self.forbidden(Action::Save));
        }
        Ok(self.bookmarks.toggle(id).await)
    }

    pub fn saved(&self) -> BTreeSet<ListingId> {
        self.bookmarks.list()
    }

    async fn confirmed_transition(
        &self,
        id: &ListingId,
        action: TransitionAction,
        reason: Option<&str>,
    ) -> Result<ListingRecord, WorkflowError> {
        let gate = self.gate(id);
        let _held = gate.lock().await;

        let current = self.lookup(id).await?;
        self.authorize(action.as_action(), &current)?;
        lifecycle::plan(current.status, action)?;

        let issued = self.issue_point();
        let record = self
            .transition_call(id, action, reason)
            .await?;
        info!(listing = %id, %action, status = %record.status, "transition confirmed");
        self.replace_entry(&record);
        self.reconcile(issued).await;
        Ok(record)
    }

    async fn optimistic_transition(
        &self,
        id: &ListingId,
        action: TransitionAction,
    ) -> Result<ListingRecord, WorkflowError> {
        debug_assert!(action.is_optimistic());
        let gate = self.gate(id);
        let _held = gate.lock().await;

        let current = self.lookup(id).await?;
        self.authorize(action.as_action(), &current)?;
        let target = lifecycle::plan(current.status, action)?;

        let flip = Optimistic::applied(current.status, target);
        self.set_status(id, *flip.speculative());
        debug!(listing = %id, %action, speculative = %target, "optimistic flip applied");

        let issued = self.issue_point();
        match self.transition_call(id, action, None).await {
            Ok(record) => {
                let confirmed = flip.commit(record.status);
                self.set_status(id, confirmed);
                self.replace_entry(&record);
                self.reconcile(issued).await;
                Ok(record)
            }
            Err(error) => {
                let prior = flip.rollback();
                self.set_status(id, prior);
                warn!(listing = %id, %action, %error, "transition failed, rolled back");
                Err(error)
            }
        }
    }

    async fn transition_call(
        &self,
        id: &ListingId,
        action: TransitionAction,
        reason: Option<&str>,
    ) -> Result<ListingRecord, WorkflowError> {
        match self.directory.transition(self.kind, id, action, reason).await {
            Ok(record) => Ok(record),
            Err(DirectoryError::NotFound) => Err(WorkflowError::NotFound(id.clone())),
            Err(other) => Err(other.into()),
        }
    }

    /// Fetch one page into the session, admitting only records the scope
    /// allows this actor to see. A result arriving after the epoch has moved
    /// on belongs to an abandoned scope and is dropped.
    async fn fetch_into(&self, scope: Scope, page: u32, epoch: u64) -> Result<(), WorkflowError> {
        let owner = scope::owner_param(scope, &self.actor).cloned();
        let request = PageRequest {
            page,
            page_size: self.settings.page_size,
        };

        let fetched = match self
            .directory
            .list(self.kind, scope, owner.as_ref(), request)
            .await
        {
            Ok(page) => page,
            Err(DirectoryError::NotFound) => super::directory::ListingPage::empty(request),
            Err(other) => return Err(other.into()),
        };

        let mut state = self.lock_state();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(%scope, page, "discarding fetch result for abandoned scope");
            return Ok(());
        }
        state.items = fetched
            .items
            .into_iter()
            .filter(|record| {
                scope::scope_admits(
                    scope,
                    &self.actor,
                    record,
                    self.settings.owner_sees_suspended,
                )
            })
            .collect();
        state.pagination = Some(fetched.pagination);
        Ok(())
    }

    /// Scope, page, and epoch as they stand right now; captured before a
    /// mutation is issued so its reconciling refetch can never use scope
    /// parameters that changed while the call was in flight.
    fn issue_point(&self) -> (Scope, u32, u64) {
        let state = self.lock_state();
        (
            state.resolution.scope,
            state.page,
            self.epoch.load(Ordering::SeqCst),
        )
    }

    /// Reconciling refetch after a successful mutation. The mutation itself
    /// already succeeded; a refetch failure only leaves the list
    /// unreconciled until the next explicit refresh.
    async fn reconcile(&self, issued: (Scope, u32, u64)) {
        let (scope, page, epoch) = issued;
        if let Err(error) = self.fetch_into(scope, page, epoch).await {
            warn!(%scope, page, %error, "reconciling refetch failed, list left unreconciled");
        }
    }

    fn authorize(&self, action: Action, record: &ListingRecord) -> Result<(), WorkflowError> {
        if policy::may(&self.actor, action, record) {
            Ok(())
        } else {
            Err(self.forbidden(action))
        }
    }

    fn forbidden(&self, action: Action) -> WorkflowError {
        WorkflowError::Forbidden {
            role: self.actor.role,
            action,
        }
    }

    fn gate(&self, id: &ListingId) -> Arc<AsyncMutex<()>> {
        let mut gates = self.gates.lock().expect("gate mutex poisoned");
        gates
            .entry(id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn known(&self, id: &ListingId) -> Option<ListingRecord> {
        self.lock_state()
            .items
            .iter()
            .find(|record| &record.id == id)
            .cloned()
    }

    fn set_status(&self, id: &ListingId, status: LifecycleStatus) {
        let mut state = self.lock_state();
        if let Some(record) = state.items.iter_mut().find(|record| &record.id == id) {
            record.status = status;
        }
    }

    fn replace_entry(&self, record: &ListingRecord) {
        let mut state = self.lock_state();
        if let Some(entry) = state.items.iter_mut().find(|entry| entry.id == record.id) {
            *entry = record.clone();
        }
    }

    fn remove_entry(&self, id: &ListingId) {
        let mut state = self.lock_state();
        state.items.retain(|record| &record.id != id);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().expect("session mutex poisoned")
    }
}

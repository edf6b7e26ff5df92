use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use crate::listings::directory::{
    DirectoryError, ListingDirectory, ListingPage, PageRequest, Pagination,
};
use crate::listings::domain::{
    LifecycleStatus, ListingDraft, ListingId, ListingPatch, ListingRecord, ResourceKind, UserId,
};
use crate::listings::lifecycle::{self, TransitionAction};
use crate::listings::scope::Scope;
use crate::listings::test_support::record_of_kind;

pub(super) fn property(id: &str, owner: &str, status: LifecycleStatus) -> ListingRecord {
    record_of_kind(ResourceKind::Property, id, owner, status)
}

fn paginate(items: Vec<ListingRecord>, page: PageRequest) -> ListingPage {
    let total_items = items.len() as u64;
    let page_size = page.page_size.max(1);
    let total_pages = total_items.div_ceil(page_size as u64) as u32;
    // Offset in u64: a hostile page number must not overflow.
    let start = (page.page.max(1) as u64 - 1) * page_size as u64;
    let items = items
        .into_iter()
        .skip(start.min(total_items) as usize)
        .take(page_size as usize)
        .collect();
    ListingPage {
        items,
        pagination: Pagination {
            page: page.page,
            page_size,
            total_items,
            total_pages,
        },
    }
}

/// In-memory directory fake. Deliberately returns a dirty superset for the
/// `all_approved` scope so tests exercise the engine's own admission rules.
#[derive(Default)]
pub(super) struct MemoryDirectory {
    records: Mutex<BTreeMap<ListingId, ListingRecord>>,
    sequence: AtomicUsize,
    pub(super) list_calls: AtomicUsize,
    pub(super) transition_calls: AtomicUsize,
}

impl MemoryDirectory {
    pub(super) fn seeded(records: Vec<ListingRecord>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.records.lock().expect("directory mutex poisoned");
            for record in records {
                guard.insert(record.id.clone(), record);
            }
        }
        directory
    }

    pub(super) fn stored(&self, id: &ListingId) -> Option<ListingRecord> {
        self.records
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .cloned()
    }

    fn select(
        &self,
        kind: ResourceKind,
        scope: Scope,
        owner: Option<&UserId>,
    ) -> Vec<ListingRecord> {
        let guard = self.records.lock().expect("directory mutex poisoned");
        guard
            .values()
            .filter(|record| record.kind == kind)
            .filter(|record| match scope {
                Scope::Mine => owner.is_some_and(|owner| &record.owner_id == owner),
                Scope::PendingOnly => {
                    record.status == LifecycleStatus::Pending
                        && owner.map_or(true, |owner| &record.owner_id == owner)
                }
                // Dirty superset on purpose.
                Scope::AllApproved | Scope::SavedSubset => true,
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ListingDirectory for MemoryDirectory {
    async fn list(
        &self,
        kind: ResourceKind,
        scope: Scope,
        owner: Option<&UserId>,
        page: PageRequest,
    ) -> Result<ListingPage, DirectoryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(paginate(self.select(kind, scope, owner), page))
    }

    async fn get(
        &self,
        _kind: ResourceKind,
        id: &ListingId,
    ) -> Result<ListingRecord, DirectoryError> {
        self.stored(id).ok_or(DirectoryError::NotFound)
    }

    async fn create(
        &self,
        kind: ResourceKind,
        owner: &UserId,
        draft: ListingDraft,
    ) -> Result<ListingRecord, DirectoryError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let record = ListingRecord {
            id: ListingId(format!("new-{sequence}")),
            kind,
            owner_id: owner.clone(),
            status: LifecycleStatus::Pending,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            category: draft.category,
            price: draft.price,
            images: draft.images,
            attributes: draft.attributes,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.records
            .lock()
            .expect("directory mutex poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        _kind: ResourceKind,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<ListingRecord, DirectoryError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        let record = guard.get_mut(id).ok_or(DirectoryError::NotFound)?;
        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(description) = patch.description {
            record.description = Some(description);
        }
        if let Some(location) = patch.location {
            record.location = Some(location);
        }
        if let Some(category) = patch.category {
            record.category = Some(category);
        }
        if let Some(price) = patch.price {
            record.price = Some(price);
        }
        if let Some(images) = patch.images {
            record.images = images;
        }
        if let Some(attributes) = patch.attributes {
            record.attributes = attributes;
        }
        if patch.resubmit {
            record.status = LifecycleStatus::Pending;
            record.rejection_reason = None;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, _kind: ResourceKind, id: &ListingId) -> Result<(), DirectoryError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(DirectoryError::NotFound)
    }

    async fn transition(
        &self,
        _kind: ResourceKind,
        id: &ListingId,
        action: TransitionAction,
        reason: Option<&str>,
    ) -> Result<ListingRecord, DirectoryError> {
        self.transition_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        let record = guard.get_mut(id).ok_or(DirectoryError::NotFound)?;
        let next = lifecycle::next_status(record.status, action).ok_or_else(|| {
            DirectoryError::Server(format!("illegal transition {action} from {}", record.status))
        })?;
        record.status = next;
        record.rejection_reason = match action {
            TransitionAction::Reject => reason.map(str::to_string),
            _ => None,
        };
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

/// Serves reads but fails every mutation, for rollback tests.
pub(super) struct FailingDirectory {
    pub(super) inner: MemoryDirectory,
}

impl FailingDirectory {
    pub(super) fn seeded(records: Vec<ListingRecord>) -> Self {
        Self {
            inner: MemoryDirectory::seeded(records),
        }
    }
}

#[async_trait]
impl ListingDirectory for FailingDirectory {
    async fn list(
        &self,
        kind: ResourceKind,
        scope: Scope,
        owner: Option<&UserId>,
        page: PageRequest,
    ) -> Result<ListingPage, DirectoryError> {
        self.inner.list(kind, scope, owner, page).await
    }

    async fn get(
        &self,
        kind: ResourceKind,
        id: &ListingId,
    ) -> Result<ListingRecord, DirectoryError> {
        self.inner.get(kind, id).await
    }

    async fn create(
        &self,
        _kind: ResourceKind,
        _owner: &UserId,
        _draft: ListingDraft,
    ) -> Result<ListingRecord, DirectoryError> {
        Err(DirectoryError::Unavailable("backend offline".to_string()))
    }

    async fn update(
        &self,
        _kind: ResourceKind,
        _id: &ListingId,
        _patch: ListingPatch,
    ) -> Result<ListingRecord, DirectoryError> {
        Err(DirectoryError::Unavailable("backend offline".to_string()))
    }

    async fn delete(&self, _kind: ResourceKind, _id: &ListingId) -> Result<(), DirectoryError> {
        Err(DirectoryError::Unavailable("backend offline".to_string()))
    }

    async fn transition(
        &self,
        _kind: ResourceKind,
        _id: &ListingId,
        _action: TransitionAction,
        _reason: Option<&str>,
    ) -> Result<ListingRecord, DirectoryError> {
        Err(DirectoryError::Unavailable("backend offline".to_string()))
    }
}

/// Wraps [`MemoryDirectory`] and parks selected calls on a semaphore so tests
/// can control interleavings. `started` gains a permit when a gated call
/// begins; the call proceeds once `release` grants one.
pub(super) struct GatedDirectory {
    pub(super) inner: MemoryDirectory,
    pub(super) gate_lists_in_scope: Option<Scope>,
    pub(super) gate_transitions: bool,
    pub(super) started: Arc<Semaphore>,
    pub(super) release: Arc<Semaphore>,
}

impl GatedDirectory {
    pub(super) fn seeded(records: Vec<ListingRecord>) -> Self {
        Self {
            inner: MemoryDirectory::seeded(records),
            gate_lists_in_scope: None,
            gate_transitions: false,
            started: Arc::new(Semaphore::new(0)),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    async fn pass_gate(&self) {
        self.started.add_permits(1);
        self.release
            .acquire()
            .await
            .expect("gate semaphore closed")
            .forget();
    }
}

#[async_trait]
impl ListingDirectory for GatedDirectory {
    async fn list(
        &self,
        kind: ResourceKind,
        scope: Scope,
        owner: Option<&UserId>,
        page: PageRequest,
    ) -> Result<ListingPage, DirectoryError> {
        if self.gate_lists_in_scope == Some(scope) {
            self.pass_gate().await;
        }
        self.inner.list(kind, scope, owner, page).await
    }

    async fn get(
        &self,
        kind: ResourceKind,
        id: &ListingId,
    ) -> Result<ListingRecord, DirectoryError> {
        self.inner.get(kind, id).await
    }

    async fn create(
        &self,
        kind: ResourceKind,
        owner: &UserId,
        draft: ListingDraft,
    ) -> Result<ListingRecord, DirectoryError> {
        self.inner.create(kind, owner, draft).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<ListingRecord, DirectoryError> {
        self.inner.update(kind, id, patch).await
    }

    async fn delete(&self, kind: ResourceKind, id: &ListingId) -> Result<(), DirectoryError> {
        self.inner.delete(kind, id).await
    }

    async fn transition(
        &self,
        kind: ResourceKind,
        id: &ListingId,
        action: TransitionAction,
        reason: Option<&str>,
    ) -> Result<ListingRecord, DirectoryError> {
        if self.gate_transitions {
            self.pass_gate().await;
        }
        self.inner.transition(kind, id, action, reason).await
    }
}

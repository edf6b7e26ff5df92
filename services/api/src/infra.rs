use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use souk::listings::lifecycle;
use souk::listings::{
    DirectoryError, ListingDirectory, ListingDraft, ListingId, ListingPage, ListingPatch,
    ListingRecord, PageRequest, Pagination, ResourceKind, Scope, TransitionAction, UserId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory listing directory backing the development server and the demo.
///
/// It deliberately keeps the loose contract real backends have: `all` and
/// `saved` scope queries return every record of the kind, and the engine's
/// admission rules decide what each caller actually sees.
#[derive(Default)]
pub(crate) struct InMemoryListingDirectory {
    records: Mutex<BTreeMap<ListingId, ListingRecord>>,
    sequence: AtomicU64,
}

impl InMemoryListingDirectory {
    pub(crate) fn seeded(records: Vec<ListingRecord>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.lock();
            for record in records {
                guard.insert(record.id.clone(), record);
            }
        }
        directory
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ListingId, ListingRecord>> {
        self.records.lock().expect("directory mutex poisoned")
    }

    fn next_id(&self, kind: ResourceKind) -> ListingId {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        ListingId(format!("{}-{sequence:06}", kind.path_segment()))
    }
}

fn paginate(items: Vec<ListingRecord>, page: PageRequest) -> ListingPage {
    let total_items = items.len() as u64;
    let page_size = page.page_size.max(1);
    let total_pages = total_items
        .div_ceil(page_size as u64)
        .min(u32::MAX as u64) as u32;
    // Offset in u64: a hostile `?page=` value must not overflow.
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

#[async_trait]
impl ListingDirectory for InMemoryListingDirectory {
    async fn list(
        &self,
        kind: ResourceKind,
        scope: Scope,
        owner: Option<&UserId>,
        page: PageRequest,
    ) -> Result<ListingPage, DirectoryError> {
        let guard = self.lock();
        let items = guard
            .values()
            .filter(|record| record.kind == kind)
            .filter(|record| match scope {
                Scope::Mine => owner.is_some_and(|owner| &record.owner_id == owner),
                Scope::PendingOnly => {
                    record.status == souk::listings::LifecycleStatus::Pending
                        && owner.map_or(true, |owner| &record.owner_id == owner)
                }
                Scope::AllApproved | Scope::SavedSubset => true,
            })
            .cloned()
            .collect();
        Ok(paginate(items, page))
    }

    async fn get(
        &self,
        kind: ResourceKind,
        id: &ListingId,
    ) -> Result<ListingRecord, DirectoryError> {
        self.lock()
            .get(id)
            .filter(|record| record.kind == kind)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn create(
        &self,
        kind: ResourceKind,
        owner: &UserId,
        draft: ListingDraft,
    ) -> Result<ListingRecord, DirectoryError> {
        let now = Utc::now();
        let record = ListingRecord {
            id: self.next_id(kind),
            kind,
            owner_id: owner.clone(),
            status: souk::listings::LifecycleStatus::Pending,
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
        self.lock().insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<ListingRecord, DirectoryError> {
        let mut guard = self.lock();
        let record = guard
            .get_mut(id)
            .filter(|record| record.kind == kind)
            .ok_or(DirectoryError::NotFound)?;

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
            record.status = souk::listings::LifecycleStatus::Pending;
            record.rejection_reason = None;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, kind: ResourceKind, id: &ListingId) -> Result<(), DirectoryError> {
        let mut guard = self.lock();
        match guard.get(id) {
            Some(record) if record.kind == kind => {
                guard.remove(id);
                Ok(())
            }
            _ => Err(DirectoryError::NotFound),
        }
    }

    async fn transition(
        &self,
        kind: ResourceKind,
        id: &ListingId,
        action: TransitionAction,
        reason: Option<&str>,
    ) -> Result<ListingRecord, DirectoryError> {
        let mut guard = self.lock();
        let record = guard
            .get_mut(id)
            .filter(|record| record.kind == kind)
            .ok_or(DirectoryError::NotFound)?;
        let next = lifecycle::next_status(record.status, action).ok_or_else(|| {
            DirectoryError::Server(format!(
                "illegal transition {action} from {}",
                record.status.label()
            ))
        })?;
        record.status = next;
        record.rejection_reason = if action == TransitionAction::Reject {
            reason.map(str::to_string)
        } else {
            None
        };
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

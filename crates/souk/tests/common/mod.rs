use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use souk::listings::lifecycle;
use souk::listings::{
    DirectoryError, LifecycleStatus, ListingDirectory, ListingDraft, ListingId, ListingPage,
    ListingPatch, ListingRecord, PageRequest, Pagination, ResourceKind, Scope, TransitionAction,
    UserId,
};

pub fn listing(
    kind: ResourceKind,
    id: &str,
    owner: &str,
    status: LifecycleStatus,
) -> ListingRecord {
    let now = Utc::now();
    ListingRecord {
        id: ListingId(id.to_string()),
        kind,
        owner_id: UserId(owner.to_string()),
        status,
        title: format!("Listing {id}"),
        description: Some("Bright and central".to_string()),
        location: Some("Rabat".to_string()),
        category: Some("general".to_string()),
        price: Some(120),
        images: Vec::new(),
        attributes: BTreeMap::new(),
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    }
}

/// Public-API in-memory directory for integration scenarios. Serves a dirty
/// superset for `all_approved` on purpose, so the engine's own admission
/// rules are what the tests observe.
#[derive(Default)]
pub struct MemoryDirectory {
    records: Mutex<BTreeMap<ListingId, ListingRecord>>,
    sequence: AtomicUsize,
}

impl MemoryDirectory {
    pub fn seeded(records: Vec<ListingRecord>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.records.lock().expect("directory mutex poisoned");
            for record in records {
                guard.insert(record.id.clone(), record);
            }
        }
        directory
    }

    pub fn stored(&self, id: &ListingId) -> Option<ListingRecord> {
        self.records
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .cloned()
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
        let guard = self.records.lock().expect("directory mutex poisoned");
        let items: Vec<ListingRecord> = guard
            .values()
            .filter(|record| record.kind == kind)
            .filter(|record| match scope {
                Scope::Mine => owner.map_or(false, |owner| &record.owner_id == owner),
                Scope::PendingOnly => {
                    record.status == LifecycleStatus::Pending
                        && owner.map_or(true, |owner| &record.owner_id == owner)
                }
                Scope::AllApproved | Scope::SavedSubset => true,
            })
            .cloned()
            .collect();

        let total_items = items.len() as u64;
        let page_size = page.page_size.max(1);
        let total_pages = total_items.div_ceil(page_size as u64) as u32;
        // Offset in u64: a hostile page number must not overflow.
        let start = (page.page.max(1) as u64 - 1) * page_size as u64;
        Ok(ListingPage {
            items: items
                .into_iter()
                .skip(start.min(total_items) as usize)
                .take(page_size as usize)
                .collect(),
            pagination: Pagination {
                page: page.page,
                page_size,
                total_items,
                total_pages,
            },
        })
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
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        let record = guard.get_mut(id).ok_or(DirectoryError::NotFound)?;
        let next = lifecycle::next_status(record.status, action).ok_or_else(|| {
            DirectoryError::Server(format!(
                "illegal transition {action} from {}",
                record.status
            ))
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

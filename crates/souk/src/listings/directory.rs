//! The external persistence contract. The engine consumes this trait and
//! never implements a real backend; serving binaries and tests supply their
//! own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{ListingDraft, ListingId, ListingPatch, ListingRecord, ResourceKind, UserId};
use super::lifecycle::TransitionAction;
use super::scope::Scope;

/// Failures the persistence collaborator can report.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("listing not found")]
    NotFound,
    #[error("directory error: {0}")]
    Server(String),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Page cursor for listing calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const fn first(page_size: u32) -> Self {
        Self { page: 1, page_size }
    }
}

/// Pagination metadata echoed back with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// One page of listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    pub items: Vec<ListingRecord>,
    pub pagination: Pagination,
}

impl ListingPage {
    /// The page an engine stores when a listing call reports `NotFound`:
    /// an empty result, not an error.
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination {
                page: request.page,
                page_size: request.page_size,
                total_items: 0,
                total_pages: 0,
            },
        }
    }
}

/// Async persistence collaborator shared by both catalogues.
#[async_trait]
pub trait ListingDirectory: Send + Sync {
    async fn list(
        &self,
        kind: ResourceKind,
        scope: Scope,
        owner: Option<&UserId>,
        page: PageRequest,
    ) -> Result<ListingPage, DirectoryError>;

    async fn get(&self, kind: ResourceKind, id: &ListingId)
        -> Result<ListingRecord, DirectoryError>;

    async fn create(
        &self,
        kind: ResourceKind,
        owner: &UserId,
        draft: ListingDraft,
    ) -> Result<ListingRecord, DirectoryError>;

    async fn update(
        &self,
        kind: ResourceKind,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<ListingRecord, DirectoryError>;

    async fn delete(&self, kind: ResourceKind, id: &ListingId) -> Result<(), DirectoryError>;

    async fn transition(
        &self,
        kind: ResourceKind,
        id: &ListingId,
        action: TransitionAction,
        reason: Option<&str>,
    ) -> Result<ListingRecord, DirectoryError>;
}

//! The listing workflow engine: role policy, scope resolution, filtering,
//! the moderation state machine, the mutation-coordinating session, and the
//! device-local bookmark store, shared by the property and service
//! catalogues.

pub mod bookmarks;
pub mod directory;
pub mod domain;
pub mod filter;
pub mod hub;
pub mod lifecycle;
pub mod optimistic;
pub mod policy;
pub mod router;
pub mod scope;
pub mod seed;
pub mod session;

#[cfg(test)]
mod tests;

pub use bookmarks::BookmarkStore;
pub use directory::{DirectoryError, ListingDirectory, ListingPage, PageRequest, Pagination};
pub use domain::{
    Actor, LifecycleStatus, ListingDraft, ListingId, ListingPatch, ListingRecord, ResourceKind,
    Role, UserId,
};
pub use filter::{CategoryFilter, FilterState, StatusFilter};
pub use hub::ListingHub;
pub use lifecycle::TransitionAction;
pub use optimistic::Optimistic;
pub use policy::Action;
pub use router::listing_router;
pub use scope::{CreatorView, Scope, ScopeResolution, SeekerTab, ViewSelector};
pub use seed::SeedImportError;
pub use session::{ListingSession, SessionSettings, WorkflowError};

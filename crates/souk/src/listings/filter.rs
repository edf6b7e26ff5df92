//! Client-side filter pipeline. Stateless, order-preserving, AND-combined;
//! applied to the fetched list after scope admission.

use std::collections::BTreeSet;

use super::domain::{LifecycleStatus, ListingId, ListingRecord};

/// Status filter with the `all` sentinel disabling it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(LifecycleStatus),
}

impl StatusFilter {
    /// Parse a UI filter parameter. `all`, empty, and unknown values all
    /// disable the filter rather than surprising the caller with an empty
    /// list.
    pub fn from_param(value: &str) -> Self {
        match value.trim().parse::<LifecycleStatus>() {
            Ok(status) => StatusFilter::Only(status),
            Err(_) => StatusFilter::All,
        }
    }
}

/// Category/type filter with the `all` sentinel disabling it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn from_param(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(value.to_string())
        }
    }
}

/// The caller's local filter state. Every filter is independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub search: String,
    pub status: StatusFilter,
    pub category: CategoryFilter,
    pub saved_only: bool,
}

/// Apply the pipeline. Never mutates the input, never errors on absent
/// optional fields, and preserves input order, so applying the same state
/// twice is a no-op on an already-filtered list.
pub fn apply(
    resources: &[ListingRecord],
    filters: &FilterState,
    bookmarks: &BTreeSet<ListingId>,
) -> Vec<ListingRecord> {
    resources
        .iter()
        .filter(|record| matches(record, filters, bookmarks))
        .cloned()
        .collect()
}

fn matches(record: &ListingRecord, filters: &FilterState, bookmarks: &BTreeSet<ListingId>) -> bool {
    let needle = filters.search.trim().to_lowercase();
    if !needle.is_empty() && !text_matches(record, &needle) {
        return false;
    }

    if let StatusFilter::Only(status) = filters.status {
        if record.status != status {
            return false;
        }
    }

    if let CategoryFilter::Only(category) = &filters.category {
        // Absent taxonomy field is a non-match, not an error.
        if record.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }

    if filters.saved_only && !bookmarks.contains(&record.id) {
        return false;
    }

    true
}

fn text_matches(record: &ListingRecord, needle: &str) -> bool {
    if record.title.to_lowercase().contains(needle) {
        return true;
    }
    if let Some(location) = &record.location {
        if location.to_lowercase().contains(needle) {
            return true;
        }
    }
    if let Some(description) = &record.description {
        if description.to_lowercase().contains(needle) {
            return true;
        }
    }
    false
}

//! CSV fixture importer. Demo and test environments seed the directory from
//! a flat export: one row per listing with the common columns; anything
//! beyond them lands in the record's free-form attributes.
//!
//! Expected header:
//! `kind,owner,title,description,location,category,price,status,rejection_reason`
//! with `description`, `location`, `category`, `price`, `status`, and
//! `rejection_reason` optional per row. A missing status seeds the listing as
//! `pending`.

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Deserialize;

use super::domain::{LifecycleStatus, ListingId, ListingRecord, ResourceKind, UserId};

#[derive(Debug)]
pub enum SeedImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Row { line: u64, message: String },
}

impl std::fmt::Display for SeedImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedImportError::Io(err) => write!(f, "failed to read seed file: {}", err),
            SeedImportError::Csv(err) => write!(f, "invalid seed CSV data: {}", err),
            SeedImportError::Row { line, message } => {
                write!(f, "invalid seed row at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for SeedImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeedImportError::Io(err) => Some(err),
            SeedImportError::Csv(err) => Some(err),
            SeedImportError::Row { .. } => None,
        }
    }
}

impl From<std::io::Error> for SeedImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SeedImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    kind: String,
    owner: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    price: Option<u32>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    rejection_reason: Option<String>,
}

static SEED_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_seed_id(kind: ResourceKind) -> ListingId {
    let id = SEED_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let prefix = match kind {
        ResourceKind::Property => "prop",
        ResourceKind::Service => "svc",
    };
    ListingId(format!("{prefix}-{id:06}"))
}

/// Parse listing fixtures from any reader.
pub fn records_from_reader<R: Read>(reader: R) -> Result<Vec<ListingRecord>, SeedImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, row) in csv_reader.deserialize::<SeedRow>().enumerate() {
        // Header occupies line 1; data rows start at 2.
        let line = index as u64 + 2;
        let row = row?;

        let kind = row
            .kind
            .parse::<ResourceKind>()
            .map_err(|message| SeedImportError::Row { line, message })?;
        let status = match row.status.as_deref().filter(|value| !value.is_empty()) {
            Some(value) => value
                .parse::<LifecycleStatus>()
                .map_err(|message| SeedImportError::Row { line, message })?,
            None => LifecycleStatus::Pending,
        };
        if row.title.is_empty() {
            return Err(SeedImportError::Row {
                line,
                message: "title must not be empty".to_string(),
            });
        }

        let now = Utc::now();
        records.push(ListingRecord {
            id: next_seed_id(kind),
            kind,
            owner_id: UserId(row.owner),
            status,
            title: row.title,
            description: row.description.filter(|value| !value.is_empty()),
            location: row.location.filter(|value| !value.is_empty()),
            category: row.category.filter(|value| !value.is_empty()),
            price: row.price,
            images: Vec::new(),
            attributes: Default::default(),
            rejection_reason: if status == LifecycleStatus::Rejected {
                row.rejection_reason.filter(|value| !value.is_empty())
            } else {
                None
            },
            created_at: now,
            updated_at: now,
        });
    }

    Ok(records)
}

/// Parse listing fixtures from a CSV file on disk.
pub fn records_from_path(path: &Path) -> Result<Vec<ListingRecord>, SeedImportError> {
    let file = std::fs::File::open(path)?;
    records_from_reader(file)
}

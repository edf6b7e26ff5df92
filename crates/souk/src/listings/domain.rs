use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for marketplace users.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discriminator for the two catalogues sharing this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Property,
    Service,
}

impl ResourceKind {
    pub const fn label(self) -> &'static str {
        match self {
            ResourceKind::Property => "property",
            ResourceKind::Service => "service",
        }
    }

    /// URL path segment used by the HTTP surface.
    pub const fn path_segment(self) -> &'static str {
        match self {
            ResourceKind::Property => "properties",
            ResourceKind::Service => "services",
        }
    }

    /// Stable key for the device-local saved set backing file.
    pub const fn storage_name(self) -> &'static str {
        match self {
            ResourceKind::Property => "saved_properties",
            ResourceKind::Service => "saved_services",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "property" | "properties" => Ok(ResourceKind::Property),
            "service" | "services" => Ok(ResourceKind::Service),
            other => Err(format!("unknown resource kind: {other}")),
        }
    }
}

/// Moderation state of a listing. Terminal-free: every state is revisitable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl LifecycleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LifecycleStatus::Pending => "pending",
            LifecycleStatus::Approved => "approved",
            LifecycleStatus::Rejected => "rejected",
            LifecycleStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LifecycleStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(LifecycleStatus::Pending),
            "approved" => Ok(LifecycleStatus::Approved),
            "rejected" => Ok(LifecycleStatus::Rejected),
            "suspended" => Ok(LifecycleStatus::Suspended),
            other => Err(format!("unknown lifecycle status: {other}")),
        }
    }
}

/// Actor roles. `Guest` is the implicit anonymous role and the fail-closed
/// answer for claims the engine does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Seeker,
    Landlord,
    Agent,
    Provider,
    Moderator,
}

impl Role {
    /// Parse an upstream-validated role claim. Unknown values map to `Guest`
    /// so a stale or malformed claim can never widen access.
    pub fn from_claim(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "seeker" => Role::Seeker,
            "landlord" => Role::Landlord,
            "agent" => Role::Agent,
            "provider" => Role::Provider,
            "moderator" | "admin" => Role::Moderator,
            _ => Role::Guest,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Seeker => "seeker",
            Role::Landlord => "landlord",
            Role::Agent => "agent",
            Role::Provider => "provider",
            Role::Moderator => "moderator",
        }
    }

    /// The catalogue this role creates listings in, if it is a creator role.
    pub const fn creator_kind(self) -> Option<ResourceKind> {
        match self {
            Role::Landlord | Role::Agent => Some(ResourceKind::Property),
            Role::Provider => Some(ResourceKind::Service),
            Role::Guest | Role::Seeker | Role::Moderator => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The caller identity threaded explicitly through every engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role,
        }
    }

    pub fn owns(&self, record: &ListingRecord) -> bool {
        self.user_id == record.owner_id
    }
}

/// A property or service listing as the persistence collaborator returns it.
///
/// Kind-specific extras beyond the common columns ride in `attributes` so the
/// two catalogues share one record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: ListingId,
    pub kind: ResourceKind,
    pub owner_id: UserId,
    pub status: LifecycleStatus,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload. Status is never caller-supplied; new listings always
/// enter the lifecycle as `pending`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Partial edit payload. `None` fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, String>>,
    /// Set by the session when it edits a `rejected` listing, folding the
    /// rejected→pending resubmission into the same update call. Never
    /// accepted from wire payloads.
    #[serde(skip)]
    pub resubmit: bool,
}

impl ListingPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.images.is_none()
            && self.attributes.is_none()
    }
}

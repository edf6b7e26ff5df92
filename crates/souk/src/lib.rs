//! Role-scoped listing and moderation workflow engine.
//!
//! The marketplace ships two nearly identical catalogues (rentable properties
//! and bookable services). This crate carries the shared core for both: the
//! role policy table, scope resolution, the client-side filter pipeline, the
//! moderation state machine, the mutation coordinator with its optimistic
//! toggle protocol, and the device-local bookmark store. Rendering, uploads,
//! messaging, and the persistence backend stay outside; the engine talks to
//! the backend only through the [`listings::directory::ListingDirectory`]
//! contract.

pub mod config;
pub mod error;
pub mod listings;
pub mod telemetry;

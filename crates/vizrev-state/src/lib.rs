//! vizrev-state: SurrealDB Backend for vizrev
//!
//! This crate provides the persistence layer for the release review
//! workflow. It handles all I/O with SurrealDB and exposes backend-agnostic
//! store traits.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: single-document atomicity and optimistic concurrency on releases.
//!
//! ## Key Components
//!
//! - `SurrealHandle`: Manages connection and queries
//! - `ReleaseStore` / `RepositoryStore`: the persistence boundary
//! - `fakes`: in-memory stores for tests

mod error;
pub mod fakes;
mod handle;
pub mod storage_traits;
mod surreal_store;

pub use error::{StateError, StorageError};
pub use handle::{CloudConfig, SurrealHandle};
pub use storage_traits::{
    ReleaseId, ReleasePatch, ReleaseRecord, ReleaseStore, RepositoryId, RepositoryRecord,
    RepositoryStore, StatusId, StorageResult, VerificationEntry,
};
pub use surreal_store::{SurrealReleaseStore, SurrealRepositoryStore};

/// Result type for vizrev-state connection operations
pub type Result<T> = std::result::Result<T, StateError>;

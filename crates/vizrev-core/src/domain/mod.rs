//! Domain models for vizrev.
//!
//! - `NewRelease`: a release submitted for review
//! - `NewStatus` / `StatusPatch`: reviewer submissions
//! - `ReviewError`: the workflow's error taxonomy

pub mod error;
pub mod release;
pub mod verification;

pub use error::{Result, ReviewError};
pub use release::{validate_patch, NewRelease};
pub use verification::{NewStatus, StatusPatch};

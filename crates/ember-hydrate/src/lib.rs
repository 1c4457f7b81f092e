//! The hydration pipeline — the asynchronous process that resolves an
//! identity, paginates its repository across all registered collections,
//! applies time-window filtering, batch-persists deduplicated activity rows,
//! and drives the status state machine the front end observes.
//!
//! Everything here is generic over [`ember_core::store::HandleStore`] and the
//! remote traits, so tests run against an in-memory store and fake remotes.

pub mod error;
pub mod fetch;
pub mod persist;
pub mod run;
pub mod window;
pub mod worker;

pub use error::{Error, Result};
pub use run::{HydrationSummary, hydrate};
pub use worker::{HydrationJob, Hydrator};

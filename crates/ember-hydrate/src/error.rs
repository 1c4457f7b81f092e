//! Error type for `ember-hydrate`.
//!
//! Only a few conditions escalate to a terminal `error` status: resolution
//! failures, non-duplicate persistence failures, and anything unexpected.
//! Per-collection fetch errors and duplicate-row conflicts are absorbed
//! inside the run and never appear here.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("handle not found: {0}")]
  HandleNotFound(Uuid),

  /// A run is already in flight for this handle; the compare-and-swap
  /// status transition rejected the second trigger.
  #[error("handle {0} is already hydrating")]
  AlreadyHydrating(Uuid),

  #[error("resolution failed: {0}")]
  Resolution(String),

  /// A status write or a non-duplicate persistence failure.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The background run could not be scheduled at all.
  #[error("failed to submit hydration job: {0}")]
  Submission(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types for `ember-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("handle not found: {0}")]
  HandleNotFound(Uuid),

  #[error("invalid handle: {0:?}")]
  InvalidHandle(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error type for `ember-store-sqlite`.

use ember_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// A uniqueness constraint rejected the write. Recoverable for activity
  /// rows (the row is already present); fatal for duplicate handles.
  #[error("unique constraint violation")]
  UniqueViolation,

  #[error("handle not found: {0}")]
  HandleNotFound(uuid::Uuid),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored text value failed to parse back into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

// Uniqueness failures surface as `SqliteFailure`; fold them into the
// dedicated variant so callers can branch without digging through codes.
// Other constraint classes (foreign keys, NOT NULL, CHECK) are not
// recoverable duplicates and stay plain database errors.
impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _)) = &e
      && (f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    {
      return Error::UniqueViolation;
    }
    Error::Database(e)
  }
}

impl StoreError for Error {
  fn is_unique_violation(&self) -> bool {
    matches!(self, Error::UniqueViolation)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

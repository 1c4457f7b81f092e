//! The `HandleStore` trait and change-notification types.
//!
//! The trait is implemented by storage backends (e.g. `ember-store-sqlite`).
//! Higher layers (`ember-hydrate`, `ember-server`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  activity::{CollectionTotal, DailyCount, NewActivity},
  handle::{HandleRecord, HandleStatus, ProfileSnapshot},
};

// ─── Change notifications ────────────────────────────────────────────────────

/// A change event emitted by the store, in commit order.
///
/// Readers subscribe instead of polling: the front end watches for
/// `HandleChanged` to track the status state machine and `ActivityInserted`
/// to refresh heatmap data incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
  HandleChanged { id: Uuid },
  ActivityInserted { handle_id: Uuid, rows: usize },
}

// ─── Error capability ────────────────────────────────────────────────────────

/// Capability the pipeline needs from a backend's error type: telling a
/// uniqueness-constraint conflict apart from everything else. Conflicts are
/// recoverable (the row is already present); all other errors abort the run.
pub trait StoreError: std::error::Error {
  fn is_unique_violation(&self) -> bool;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Ember storage backend.
///
/// Handle rows are mutated only through the narrow operations below; activity
/// rows are insert-only and deduplicated by a composite uniqueness constraint
/// on (handle, collection, timestamp).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait HandleStore: Send + Sync {
  type Error: StoreError + Send + Sync + 'static;

  // ── Handles ───────────────────────────────────────────────────────────

  /// Create a handle row in `Pending` status with a cached profile snapshot.
  ///
  /// Fails if a row for the same handle already exists (case-insensitive
  /// unique index).
  fn create_handle<'a>(
    &'a self,
    handle: &'a str,
    profile: ProfileSnapshot,
  ) -> impl Future<Output = Result<HandleRecord, Self::Error>> + Send + 'a;

  /// Retrieve a handle row by id. Returns `None` if not found.
  fn get_handle(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<HandleRecord>, Self::Error>> + Send + '_;

  /// Case-insensitive lookup by handle string.
  fn find_by_handle<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Result<Option<HandleRecord>, Self::Error>> + Send + 'a;

  /// Write `status` (and the error message, cleared when `None`), bumping
  /// `updated_at` to now. Emits [`StoreEvent::HandleChanged`].
  fn set_status(
    &self,
    id: Uuid,
    status: HandleStatus,
    error_message: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Compare-and-swap transition into `Hydrating`.
  ///
  /// Succeeds (returns `true`) only when the row exists and is not already
  /// `Hydrating`; a second concurrent trigger for the same handle observes
  /// `false` and must not start a run.
  fn try_begin_hydrating(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Overwrite `updated_at` without touching status. Used to reset the
  /// delta high-water mark to start-of-day after a successful delta run.
  fn set_updated_at(
    &self,
    id: Uuid,
    updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a handle row and cascade-delete its activity rows.
  fn delete_handle(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Activity ──────────────────────────────────────────────────────────

  /// Insert a batch of activity rows, all-or-nothing.
  ///
  /// A uniqueness violation anywhere in the batch fails the whole batch with
  /// an error for which [`StoreError::is_unique_violation`] returns `true`;
  /// the caller then falls back to [`HandleStore::insert_activity`].
  /// Emits [`StoreEvent::ActivityInserted`] on success.
  fn insert_activity_batch<'a>(
    &'a self,
    handle_id: Uuid,
    rows: &'a [NewActivity],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Insert one activity row. Returns `Ok(false)` when the row already
  /// exists (uniqueness conflict — not an error).
  fn insert_activity<'a>(
    &'a self,
    handle_id: Uuid,
    row: &'a NewActivity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Per-day activity counts in `[since, until)`, ordered by day. Backed by
  /// the (handle, timestamp) range index.
  fn daily_counts(
    &self,
    handle_id: Uuid,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<DailyCount>, Self::Error>> + Send + '_;

  /// Total row count per collection NSID for one handle.
  fn collection_totals(
    &self,
    handle_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CollectionTotal>, Self::Error>> + Send + '_;

  /// Total activity rows stored for one handle.
  fn activity_count(
    &self,
    handle_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Subscribe to change events. Events are emitted in the order writes
  /// commit; a lagging receiver may miss events (broadcast semantics) and
  /// should re-read current state when that happens.
  fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

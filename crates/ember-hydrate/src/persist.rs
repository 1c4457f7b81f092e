//! The batch persister — deduplicates and writes fetched records in bounded
//! batches, tolerating uniqueness conflicts.

use std::collections::HashSet;

use ember_core::{
  activity::NewActivity,
  store::{HandleStore, StoreError as _},
};
use uuid::Uuid;

/// Rows per storage write.
pub const BATCH_SIZE: usize = 1000;

/// Persist `rows` for `handle_id` in [`BATCH_SIZE`] batches.
///
/// Each batch is first deduplicated against itself on the uniqueness triple
/// (handle, collection, timestamp), then written in one insert. When storage
/// rejects a batch with a uniqueness violation — some row already exists
/// from an earlier run — the batch falls back to row-at-a-time inserts,
/// discarding only the conflicting rows. Any other storage error aborts and
/// propagates.
///
/// Returns the number of rows actually written.
pub async fn persist_batches<S: HandleStore>(
  store: &S,
  handle_id: Uuid,
  rows: &[NewActivity],
) -> Result<usize, S::Error> {
  let mut persisted = 0;

  for batch in rows.chunks(BATCH_SIZE) {
    let batch = dedup_batch(batch);

    match store.insert_activity_batch(handle_id, &batch).await {
      Ok(()) => persisted += batch.len(),
      Err(e) if e.is_unique_violation() => {
        tracing::debug!(
          rows = batch.len(),
          "batch hit existing rows; falling back to row-at-a-time inserts"
        );
        for row in &batch {
          if store.insert_activity(handle_id, row).await? {
            persisted += 1;
          }
        }
      }
      Err(e) => return Err(e),
    }
  }

  Ok(persisted)
}

/// Drop rows that collide on (collection, timestamp) within the batch
/// itself, keeping the first occurrence.
fn dedup_batch(batch: &[NewActivity]) -> Vec<NewActivity> {
  let mut seen = HashSet::new();
  batch
    .iter()
    .filter(|r| seen.insert((r.collection.clone(), r.timestamp)))
    .cloned()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use ember_store_sqlite::SqliteStore;

  fn row(collection: &str, hour: u32) -> NewActivity {
    NewActivity {
      collection: collection.to_string(),
      timestamp:  Utc.with_ymd_and_hms(2026, 6, 15, hour, 0, 0).unwrap(),
    }
  }

  async fn store_with_handle() -> (SqliteStore, Uuid) {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let record = s
      .create_handle("alice.example", ember_core::handle::ProfileSnapshot {
        did:          "did:plc:alice".into(),
        handle:       "alice.example".into(),
        display_name: None,
        description:  None,
        avatar:       None,
      })
      .await
      .unwrap();
    (s, record.id)
  }

  #[tokio::test]
  async fn in_batch_duplicates_are_dropped_before_writing() {
    let (s, id) = store_with_handle().await;

    let rows = vec![row("a.b.c", 1), row("a.b.c", 1), row("a.b.c", 2)];
    let persisted = persist_batches(&s, id, &rows).await.unwrap();

    assert_eq!(persisted, 2);
    assert_eq!(s.activity_count(id).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn conflict_with_stored_rows_falls_back_per_row() {
    let (s, id) = store_with_handle().await;

    // One row already present from an earlier run.
    s.insert_activity(id, &row("a.b.c", 1)).await.unwrap();

    let rows = vec![row("a.b.c", 1), row("a.b.c", 2), row("x.y.z", 3)];
    let persisted = persist_batches(&s, id, &rows).await.unwrap();

    // Only the two new rows were written; the duplicate was discarded.
    assert_eq!(persisted, 2);
    assert_eq!(s.activity_count(id).await.unwrap(), 3);
  }

  #[tokio::test]
  async fn empty_input_is_a_no_op() {
    let (s, id) = store_with_handle().await;
    assert_eq!(persist_batches(&s, id, &[]).await.unwrap(), 0);
  }
}

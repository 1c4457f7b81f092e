//! The hydration orchestrator — the top-level state machine.
//!
//! `pending → hydrating → complete`, with a side exit to `error` from either
//! non-terminal state. The `hydrating` transition happens before resolution,
//! so an unresolvable handle visits `hydrating` on its way to `error`. Both
//! `complete` and `error` are terminal for a run; a later delta run re-enters
//! `hydrating` from `complete`.

use std::time::{Duration, Instant};

use chrono::Utc;
use ember_core::{
  handle::HandleStatus,
  registry::CollectionRegistry,
  remote::{IdentityResolver, RepoHost},
  store::HandleStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  fetch::fetch_collection,
  persist::persist_batches,
  window::{FetchWindow, start_of_day},
};

/// What a finished run reports back.
#[derive(Debug, Clone, Serialize)]
pub struct HydrationSummary {
  pub handle_id: Uuid,
  /// Records accumulated across all collections, pre-filtering.
  pub fetched:   usize,
  /// Rows actually written (after dedup and conflict discards).
  pub persisted: usize,
  #[serde(skip)]
  pub elapsed:   Duration,
  pub delta:     bool,
}

/// Run hydration for one handle, recording the outcome on its row.
///
/// This is the outermost wrapper: any failure past the compare-and-swap is
/// caught and best-effort recorded as `error` status with the failure
/// message, so a run never strands the row in `hydrating` (short of the
/// process dying). A rejected concurrent trigger is passed through without
/// touching the row — the in-flight run owns it.
pub async fn hydrate<S, I, R>(
  store: &S,
  resolver: &I,
  repo: &R,
  registry: &CollectionRegistry,
  handle_id: Uuid,
  delta: bool,
) -> Result<HydrationSummary>
where
  S: HandleStore,
  I: IdentityResolver,
  R: RepoHost,
{
  match run(store, resolver, repo, registry, handle_id, delta).await {
    Ok(summary) => {
      tracing::info!(
        %handle_id,
        fetched = summary.fetched,
        persisted = summary.persisted,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        delta,
        "hydration complete"
      );
      Ok(summary)
    }
    Err(e @ Error::AlreadyHydrating(_)) => Err(e),
    Err(e) => {
      tracing::error!(%handle_id, error = %e, "hydration failed");
      if let Err(update_err) = store
        .set_status(handle_id, HandleStatus::Error, Some(e.to_string()))
        .await
      {
        // Not retried; the row may be left stale until the next trigger.
        tracing::error!(
          %handle_id,
          error = %update_err,
          "failed to record error status"
        );
      }
      Err(e)
    }
  }
}

async fn run<S, I, R>(
  store: &S,
  resolver: &I,
  repo: &R,
  registry: &CollectionRegistry,
  handle_id: Uuid,
  delta: bool,
) -> Result<HydrationSummary>
where
  S: HandleStore,
  I: IdentityResolver,
  R: RepoHost,
{
  let started = Instant::now();
  let now = Utc::now();

  // Load before the CAS: the delta lower bound is the pre-run high-water
  // mark, and the CAS itself bumps `updated_at`.
  let record = store
    .get_handle(handle_id)
    .await
    .map_err(box_store)?
    .ok_or(Error::HandleNotFound(handle_id))?;

  if !store.try_begin_hydrating(handle_id).await.map_err(box_store)? {
    return Err(Error::AlreadyHydrating(handle_id));
  }

  let identity = resolver
    .resolve(&record.handle)
    .await
    .map_err(|e| Error::Resolution(e.to_string()))?;

  let window = FetchWindow::compute(now, record.updated_at, delta);
  tracing::info!(
    handle = %record.handle,
    did = %identity.did,
    cutoff = %window.cutoff,
    lower_bound = ?window.lower_bound,
    delta,
    "hydrating"
  );

  // Every registered collection contributes what it can; per-collection
  // failures are absorbed inside the fetcher.
  let mut all = Vec::new();
  for descriptor in registry.iter() {
    for collection in &descriptor.collections {
      let rows = fetch_collection(
        repo,
        &identity,
        collection,
        &descriptor.timestamp_field,
        &window,
      )
      .await;
      tracing::debug!(collection = %collection, rows = rows.len(), "collection fetched");
      all.extend(rows);
    }
  }
  let fetched = all.len();

  // The current day is still accumulating records; persisting it now would
  // freeze an incomplete day. Delta runs drop it and re-fetch next time.
  let today = start_of_day(now);
  if delta {
    all.retain(|r| r.timestamp < today);
  }

  let persisted = if all.is_empty() {
    0
  } else {
    persist_batches(store, handle_id, &all)
      .await
      .map_err(box_store)?
  };

  store
    .set_status(handle_id, HandleStatus::Complete, None)
    .await
    .map_err(box_store)?;

  if delta {
    store
      .set_updated_at(handle_id, today)
      .await
      .map_err(box_store)?;
  }

  Ok(HydrationSummary {
    handle_id,
    fetched,
    persisted,
    elapsed: started.elapsed(),
    delta,
  })
}

fn box_store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Store(Box::new(e))
}

//! Handlers for `/handles/{id}` read and reset endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/handles/{id}` | 404 if not found |
//! | `GET`    | `/handles/{id}/heatmap` | daily counts over the last year |
//! | `GET`    | `/handles/{id}/collections` | totals with display metadata |
//! | `DELETE` | `/handles/{id}` | cascades activity rows |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::{Duration, Utc};
use ember_core::{
  activity::DailyCount,
  handle::HandleRecord,
  registry::DEFAULT_COLOR,
  remote::ProfileSource,
  store::HandleStore,
};
use ember_hydrate::window::LOOKBACK_DAYS;
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /handles/{id}`
pub async fn get_one<S, P>(
  State(state): State<AppState<S, P>>,
  Path(id): Path<Uuid>,
) -> Result<Json<HandleRecord>, ApiError>
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  let record = state
    .store
    .get_handle(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("handle {id} not found")))?;
  Ok(Json(record))
}

// ─── Heatmap ─────────────────────────────────────────────────────────────────

/// `GET /handles/{id}/heatmap` — per-day counts over the lookback window.
///
/// Days with no activity are absent; the grid renderer fills the gaps.
pub async fn heatmap<S, P>(
  State(state): State<AppState<S, P>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DailyCount>>, ApiError>
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  ensure_exists(&state, id).await?;

  let until = Utc::now();
  let since = until - Duration::days(LOOKBACK_DAYS);
  let days = state
    .store
    .daily_counts(id, since, until)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(days))
}

// ─── Collection totals ───────────────────────────────────────────────────────

/// One collection's stored-row total joined with its registry metadata.
#[derive(Debug, Serialize)]
pub struct CollectionSummary {
  pub collection:   String,
  pub display_name: String,
  pub color:        String,
  pub count:        u64,
}

/// `GET /handles/{id}/collections`
///
/// Collections without a registry entry fall back to the raw NSID and the
/// default colour.
pub async fn collections<S, P>(
  State(state): State<AppState<S, P>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CollectionSummary>>, ApiError>
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  ensure_exists(&state, id).await?;

  let totals = state
    .store
    .collection_totals(id)
    .await
    .map_err(ApiError::store)?;

  let summaries = totals
    .into_iter()
    .map(|t| {
      let descriptor = state.registry.descriptor_for(&t.collection);
      CollectionSummary {
        display_name: descriptor
          .map(|d| d.display_name.clone())
          .unwrap_or_else(|| t.collection.clone()),
        color:        descriptor
          .map(|d| d.color.clone())
          .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        collection:   t.collection,
        count:        t.total,
      }
    })
    .collect();
  Ok(Json(summaries))
}

// ─── Reset ───────────────────────────────────────────────────────────────────

/// `DELETE /handles/{id}` — remove the row and all its activity.
pub async fn delete_one<S, P>(
  State(state): State<AppState<S, P>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  let deleted = state
    .store
    .delete_handle(id)
    .await
    .map_err(ApiError::store)?;
  if deleted {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("handle {id} not found")))
  }
}

async fn ensure_exists<S, P>(
  state: &AppState<S, P>,
  id: Uuid,
) -> Result<(), ApiError>
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  state
    .store
    .get_handle(id)
    .await
    .map_err(ApiError::store)?
    .map(|_| ())
    .ok_or_else(|| ApiError::NotFound(format!("handle {id} not found")))
}

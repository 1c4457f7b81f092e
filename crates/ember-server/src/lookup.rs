//! Handler for `POST /api/lookup` — the trigger surface.
//!
//! Body: `{"handle":"@Alice.Example"}`. The response carries the row id and
//! its status at the time of the call; the run's outcome is observed through
//! the handle endpoints, never through this one.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use ember_core::{
  handle::{HandleStatus, normalize_handle},
  remote::{ProfileError as _, ProfileSource},
  store::{HandleStore, StoreError as _},
};
use ember_hydrate::{HydrationJob, window::start_of_day};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Message written to the row when the job queue refuses a submission.
const SUBMISSION_FAILED_MESSAGE: &str = "Failed to start hydration process";

#[derive(Debug, Deserialize)]
pub struct LookupBody {
  pub handle: String,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
  pub id:     Uuid,
  pub status: HandleStatus,
}

/// `POST /api/lookup`
pub async fn handler<S, P>(
  State(state): State<AppState<S, P>>,
  Json(body): Json<LookupBody>,
) -> Result<(StatusCode, Json<LookupResponse>), ApiError>
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  let handle =
    normalize_handle(&body.handle).map_err(|e| ApiError::BadRequest(e.to_string()))?;

  // The profile lookup doubles as the opt-out gate: nothing is stored for
  // an account that refuses logged-out viewers.
  let profile = state.profiles.get_profile(&handle).await.map_err(|e| {
    if e.is_opt_out() {
      ApiError::OptedOut
    } else if e.is_resolution() {
      ApiError::NotFound(format!("handle {handle} not found"))
    } else {
      ApiError::Upstream(e.to_string())
    }
  })?;

  if let Some(record) = state
    .store
    .find_by_handle(&handle)
    .await
    .map_err(ApiError::store)?
  {
    // A finished row whose high-water mark predates today gets a catch-up
    // delta run; anything else is returned as-is.
    if record.status == HandleStatus::Complete
      && record.updated_at < start_of_day(Utc::now())
    {
      submit(&state, HydrationJob { handle_id: record.id, delta: true }).await?;
    }
    return Ok((StatusCode::OK, Json(LookupResponse {
      id:     record.id,
      status: record.status,
    })));
  }

  let record = match state.store.create_handle(&handle, profile).await {
    Ok(record) => record,
    // Lost a race against a concurrent lookup for the same handle.
    Err(e) if e.is_unique_violation() => state
      .store
      .find_by_handle(&handle)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("handle {handle} not found")))?,
    Err(e) => return Err(ApiError::store(e)),
  };

  submit(&state, HydrationJob { handle_id: record.id, delta: false }).await?;

  Ok((StatusCode::CREATED, Json(LookupResponse {
    id:     record.id,
    status: record.status,
  })))
}

/// Enqueue a run. A refused submission marks the row `error` synchronously
/// rather than failing the response; the caller still gets the id and reads
/// the failure through status.
async fn submit<S, P>(
  state: &AppState<S, P>,
  job: HydrationJob,
) -> Result<(), ApiError>
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  if let Err(e) = state.hydrator.submit(job) {
    tracing::error!(
      handle_id = %job.handle_id,
      error = %e,
      "hydration submission failed"
    );
    state
      .store
      .set_status(
        job.handle_id,
        HandleStatus::Error,
        Some(SUBMISSION_FAILED_MESSAGE.to_string()),
      )
      .await
      .map_err(ApiError::store)?;
  }
  Ok(())
}

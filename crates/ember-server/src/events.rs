//! Handler for `GET /handles/{id}/events` — the change-notification stream.
//!
//! Server-sent events carrying [`StoreEvent`]s for one handle. The front end
//! subscribes here instead of polling: `handle_changed` tracks the status
//! state machine, `activity_inserted` prompts a heatmap refresh.

use std::convert::Infallible;

use axum::{
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
};
use ember_core::{remote::ProfileSource, store::{HandleStore, StoreEvent}};
use tokio_stream::{Stream, StreamExt as _, wrappers::BroadcastStream};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /handles/{id}/events`
pub async fn stream<S, P>(
  State(state): State<AppState<S, P>>,
  Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  state
    .store
    .get_handle(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("handle {id} not found")))?;

  let rx = state.store.subscribe();
  let events = BroadcastStream::new(rx).filter_map(move |item| {
    // A lagged receiver dropped events; the client re-reads current state on
    // its next event, so the gap is skipped rather than surfaced.
    let event = item.ok()?;
    let relevant = match &event {
      StoreEvent::HandleChanged { id: changed } => *changed == id,
      StoreEvent::ActivityInserted { handle_id, .. } => *handle_id == id,
    };
    if !relevant {
      return None;
    }
    Event::default().json_data(&event).ok().map(Ok)
  });

  Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

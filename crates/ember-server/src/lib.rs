//! JSON REST API for Ember.
//!
//! Exposes an axum [`Router`] backed by any [`HandleStore`] and
//! [`ProfileSource`], plus the background [`Hydrator`] the lookup endpoint
//! submits runs to. TLS and transport concerns are the caller's
//! responsibility.

pub mod error;
pub mod events;
pub mod handles;
pub mod lookup;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use ember_core::{registry::CollectionRegistry, remote::ProfileSource, store::HandleStore};
use ember_hydrate::Hydrator;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// `EMBER_*` environment. Every field has a default so the server runs with
/// no configuration at all.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3030 }
fn default_store_path() -> PathBuf { PathBuf::from("ember.db") }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       default_host(),
      port:       default_port(),
      store_path: default_store_path(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: HandleStore, P: ProfileSource> {
  pub store:    Arc<S>,
  pub profiles: Arc<P>,
  pub hydrator: Hydrator,
  pub registry: Arc<CollectionRegistry>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for `state`.
pub fn router<S, P>(state: AppState<S, P>) -> Router
where
  S: HandleStore + Clone + 'static,
  P: ProfileSource + Clone + 'static,
{
  Router::new()
    .route("/api/lookup", post(lookup::handler::<S, P>))
    .route(
      "/api/handles/{id}",
      get(handles::get_one::<S, P>).delete(handles::delete_one::<S, P>),
    )
    .route("/api/handles/{id}/heatmap", get(handles::heatmap::<S, P>))
    .route(
      "/api/handles/{id}/collections",
      get(handles::collections::<S, P>),
    )
    .route("/api/handles/{id}/events", get(events::stream::<S, P>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{Duration, Utc};
  use ember_core::{
    activity::NewActivity,
    handle::{HandleStatus, ProfileSnapshot},
    remote::{
      IdentityResolver, ProfileError, RecordPage, RepoHost, ResolvedIdentity,
    },
  };
  use ember_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use thiserror::Error;
  use tokio::sync::mpsc;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  // ── Fakes ─────────────────────────────────────────────────────────────────

  #[derive(Debug, Error)]
  enum FakeProfileError {
    #[error("account has opted out")]
    OptOut,
    #[error("unknown handle")]
    Unknown,
  }

  impl ProfileError for FakeProfileError {
    fn is_opt_out(&self) -> bool { matches!(self, Self::OptOut) }

    fn is_resolution(&self) -> bool { matches!(self, Self::Unknown) }
  }

  /// Knows `alice.example`; refuses `optout.example`; everything else is
  /// unresolvable.
  #[derive(Clone)]
  struct FakeProfiles;

  impl ProfileSource for FakeProfiles {
    type Error = FakeProfileError;

    async fn get_profile(
      &self,
      handle: &str,
    ) -> Result<ProfileSnapshot, FakeProfileError> {
      match handle {
        "alice.example" => Ok(ProfileSnapshot {
          did:          "did:plc:alice".into(),
          handle:       handle.to_string(),
          display_name: Some("Alice".into()),
          description:  None,
          avatar:       None,
        }),
        "optout.example" => Err(FakeProfileError::OptOut),
        _ => Err(FakeProfileError::Unknown),
      }
    }
  }

  /// Resolves everything and serves empty repositories.
  #[derive(Clone)]
  struct FakeRemote;

  impl IdentityResolver for FakeRemote {
    type Error = FakeProfileError;

    async fn resolve(
      &self,
      _handle: &str,
    ) -> Result<ResolvedIdentity, FakeProfileError> {
      Ok(ResolvedIdentity {
        did: "did:plc:fake".into(),
        pds: "https://pds.fake".into(),
      })
    }
  }

  impl RepoHost for FakeRemote {
    type Error = FakeProfileError;

    async fn list_records(
      &self,
      _identity: &ResolvedIdentity,
      _collection: &str,
      _limit: u32,
      _cursor: Option<&str>,
    ) -> Result<RecordPage, FakeProfileError> {
      Ok(RecordPage::default())
    }
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn make_state() -> (AppState<SqliteStore, FakeProfiles>, SqliteStore) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = CollectionRegistry::builtin();
    let hydrator =
      Hydrator::spawn(store.clone(), FakeRemote, FakeRemote, registry.clone());

    let state = AppState {
      store: Arc::new(store.clone()),
      profiles: Arc::new(FakeProfiles),
      hydrator,
      registry: Arc::new(registry),
    };
    (state, store)
  }

  async fn request(
    state: AppState<SqliteStore, FakeProfiles>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = router(state)
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();

    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  async fn seed_handle(store: &SqliteStore, handle: &str) -> Uuid {
    store
      .create_handle(handle, ProfileSnapshot {
        did:          "did:plc:seed".into(),
        handle:       handle.to_string(),
        display_name: None,
        description:  None,
        avatar:       None,
      })
      .await
      .unwrap()
      .id
  }

  // ── Lookup ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn lookup_creates_a_row_for_a_new_handle() {
    let (state, store) = make_state().await;

    let (status, body) = request(
      state,
      "POST",
      "/api/lookup",
      Some(json!({ "handle": "@Alice.Example " })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let id: Uuid = serde_json::from_value(body["id"].clone()).unwrap();
    let record = store.get_handle(id).await.unwrap().unwrap();
    assert_eq!(record.handle, "alice.example");
    assert_eq!(record.profile.unwrap().did, "did:plc:alice");
  }

  #[tokio::test]
  async fn lookup_same_handle_twice_returns_the_same_id() {
    let (state, _store) = make_state().await;
    let body = json!({ "handle": "alice.example" });

    let (status1, body1) =
      request(state.clone(), "POST", "/api/lookup", Some(body.clone())).await;
    let (status2, body2) =
      request(state, "POST", "/api/lookup", Some(body)).await;

    assert_eq!(status1, StatusCode::CREATED);
    assert_eq!(status2, StatusCode::OK);
    assert_eq!(body1["id"], body2["id"]);
  }

  #[tokio::test]
  async fn lookup_opted_out_account_returns_403_and_stores_nothing() {
    let (state, store) = make_state().await;

    let (status, _) = request(
      state,
      "POST",
      "/api/lookup",
      Some(json!({ "handle": "optout.example" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(store.find_by_handle("optout.example").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn lookup_unknown_handle_returns_404() {
    let (state, _store) = make_state().await;
    let (status, _) = request(
      state,
      "POST",
      "/api/lookup",
      Some(json!({ "handle": "ghost.example" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn lookup_submission_failure_marks_the_row_error() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    // A hydrator whose worker is gone refuses every submission.
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let state = AppState {
      store:    Arc::new(store.clone()),
      profiles: Arc::new(FakeProfiles),
      hydrator: Hydrator::from_sender(tx),
      registry: Arc::new(CollectionRegistry::builtin()),
    };

    let (status, body) = request(
      state,
      "POST",
      "/api/lookup",
      Some(json!({ "handle": "alice.example" })),
    )
    .await;

    // The response still carries the row id; the failure lives on the row.
    assert_eq!(status, StatusCode::CREATED);
    let id: Uuid = serde_json::from_value(body["id"].clone()).unwrap();
    let record = store.get_handle(id).await.unwrap().unwrap();
    assert_eq!(record.status, HandleStatus::Error);
    assert_eq!(
      record.error_message.as_deref(),
      Some("Failed to start hydration process")
    );
  }

  #[tokio::test]
  async fn lookup_blank_handle_returns_400() {
    let (state, _store) = make_state().await;
    let (status, _) =
      request(state, "POST", "/api/lookup", Some(json!({ "handle": "  @ " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn get_unknown_handle_returns_404() {
    let (state, _store) = make_state().await;
    let uri = format!("/api/handles/{}", Uuid::new_v4());
    let (status, _) = request(state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn heatmap_groups_counts_by_day() {
    let (state, store) = make_state().await;
    let id = seed_handle(&store, "bob.example").await;

    // Noon anchors keep each row on a known calendar day whatever the
    // current UTC time is.
    let noon = |days_ago: i64| {
      (Utc::now().date_naive() - Duration::days(days_ago))
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
    };
    for (collection, ts) in [
      ("app.bsky.feed.post", noon(2)),
      ("app.bsky.feed.post", noon(2) + Duration::hours(1)),
      ("app.bsky.feed.post", noon(3)),
    ] {
      store
        .insert_activity(id, &NewActivity {
          collection: collection.to_string(),
          timestamp:  ts,
        })
        .await
        .unwrap();
    }

    let uri = format!("/api/handles/{id}/heatmap");
    let (status, body) = request(state, "GET", &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    let days = body.as_array().unwrap();
    assert_eq!(days.len(), 2);
    // Ascending by day: the three-days-ago single row comes first.
    assert_eq!(days[0]["count"], 1);
    assert_eq!(days[1]["count"], 2);
  }

  #[tokio::test]
  async fn collection_totals_carry_registry_metadata() {
    let (state, store) = make_state().await;
    let id = seed_handle(&store, "bob.example").await;

    let now = Utc::now();
    for (collection, ts) in [
      ("app.bsky.feed.post", now - Duration::days(1)),
      ("app.bsky.feed.post", now - Duration::days(2)),
      ("com.example.unknown", now - Duration::days(3)),
    ] {
      store
        .insert_activity(id, &NewActivity {
          collection: collection.to_string(),
          timestamp:  ts,
        })
        .await
        .unwrap();
    }

    let uri = format!("/api/handles/{id}/collections");
    let (status, body) = request(state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let summaries = body.as_array().unwrap();
    let bsky = summaries
      .iter()
      .find(|s| s["collection"] == "app.bsky.feed.post")
      .unwrap();
    assert_eq!(bsky["display_name"], "Bluesky");
    assert_eq!(bsky["count"], 2);

    let unknown = summaries
      .iter()
      .find(|s| s["collection"] == "com.example.unknown")
      .unwrap();
    // No registry entry: the NSID and default colour stand in.
    assert_eq!(unknown["display_name"], "com.example.unknown");
    assert_eq!(
      unknown["color"],
      ember_core::registry::DEFAULT_COLOR
    );
    assert_eq!(unknown["count"], 1);
  }

  // ── Reset ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_removes_the_row_and_its_activity() {
    let (state, store) = make_state().await;
    let id = seed_handle(&store, "bob.example").await;
    let uri = format!("/api/handles/{id}");

    let (status, _) = request(state.clone(), "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(state.clone(), "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(state, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Events ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn events_for_unknown_handle_returns_404() {
    let (state, _store) = make_state().await;
    let uri = format!("/api/handles/{}/events", Uuid::new_v4());
    let (status, _) = request(state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}

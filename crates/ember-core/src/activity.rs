//! Activity rows — one observed record from a remote collection.
//!
//! Rows are written in bulk by the hydration pipeline and never mutated.
//! The triple (handle, collection, timestamp) is the deduplication key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An activity observation not yet bound to a handle row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
  /// Full collection NSID, e.g. `app.bsky.feed.post`.
  pub collection: String,
  /// The record's own creation timestamp, not when we fetched it.
  pub timestamp:  DateTime<Utc>,
}

/// A persisted activity row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
  pub handle_id:  Uuid,
  pub collection: String,
  pub timestamp:  DateTime<Utc>,
}

/// One cell of the heatmap: a calendar day and how many records fell on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
  pub day:   NaiveDate,
  pub count: u64,
}

/// Aggregate count for one collection NSID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTotal {
  pub collection: String,
  pub total:      u64,
}

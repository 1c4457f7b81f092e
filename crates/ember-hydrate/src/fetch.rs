//! The record fetcher — paginates one collection from a remote repository.

use chrono::{DateTime, Utc};
use ember_core::{
  activity::NewActivity,
  remote::{RepoHost, ResolvedIdentity},
};

use crate::window::FetchWindow;

/// Records requested per page, the remote's usual maximum.
pub const PAGE_SIZE: u32 = 100;

/// Fetch all of `collection`'s records inside `window`.
///
/// Pagination assumes the remote returns records newest-first: the first
/// record older than `window.cutoff` halts iteration for the whole
/// collection. If the remote ever violates that ordering, older-but-not-
/// oldest records past the halt point would be silently dropped — an
/// assumption inherited from the remote listing contract, not a verified
/// guarantee. Records older than `window.lower_bound` are excluded from the
/// result but do not halt.
///
/// Records missing the timestamp field (or carrying an unparseable one) are
/// skipped silently. Any transport or protocol error is logged and yields
/// the partial result accumulated so far — one broken collection must never
/// abort hydration for the others.
pub async fn fetch_collection<R: RepoHost>(
  repo: &R,
  identity: &ResolvedIdentity,
  collection: &str,
  timestamp_field: &str,
  window: &FetchWindow,
) -> Vec<NewActivity> {
  let mut records = Vec::new();
  let mut cursor: Option<String> = None;

  loop {
    let page = match repo
      .list_records(identity, collection, PAGE_SIZE, cursor.as_deref())
      .await
    {
      Ok(page) => page,
      Err(e) => {
        tracing::warn!(
          collection,
          error = %e,
          fetched = records.len(),
          "fetch failed; keeping partial result"
        );
        return records;
      }
    };

    for value in &page.records {
      let Some(timestamp) = record_timestamp(value, timestamp_field) else {
        continue;
      };

      if timestamp < window.cutoff {
        // Newest-first: everything after this is older still.
        return records;
      }
      if window.lower_bound.is_some_and(|lb| timestamp < lb) {
        continue;
      }

      records.push(NewActivity {
        collection: collection.to_string(),
        timestamp,
      });
    }

    match page.cursor {
      Some(next) => cursor = Some(next),
      None => return records,
    }
  }
}

/// Dig the creation timestamp out of an opaque record value.
fn record_timestamp(
  value: &serde_json::Value,
  timestamp_field: &str,
) -> Option<DateTime<Utc>> {
  let raw = value.get(timestamp_field)?.as_str()?;
  DateTime::parse_from_rfc3339(raw)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

//! [`SqliteStore`] — the SQLite implementation of [`HandleStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;

use ember_core::{
  activity::{CollectionTotal, DailyCount, NewActivity},
  handle::{HandleRecord, HandleStatus, ProfileSnapshot},
  store::{HandleStore, StoreEvent},
};

use crate::{
  encode::{
    encode_dt, encode_profile, encode_status, encode_uuid, RawHandle,
  },
  schema::SCHEMA,
  Error, Result,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

const HANDLE_COLUMNS: &str =
  "handle_id, handle, status, profile_json, error_message, created_at, \
   updated_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Ember handle store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and clones
/// share one notification channel.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_connection(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let store = Self { conn, events };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn emit(&self, event: StoreEvent) {
    // No receivers is fine; notifications are best-effort.
    let _ = self.events.send(event);
  }

  async fn query_one_handle(&self, sql: String, param: String) -> Result<Option<HandleRecord>> {
    let raw: Option<RawHandle> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], |row| {
              Ok(RawHandle {
                handle_id:     row.get(0)?,
                handle:        row.get(1)?,
                status:        row.get(2)?,
                profile_json:  row.get(3)?,
                error_message: row.get(4)?,
                created_at:    row.get(5)?,
                updated_at:    row.get(6)?,
              })
            })
            .optional()?,
        )
      })
      .await?;

    raw.map(RawHandle::into_record).transpose()
  }
}

// ─── HandleStore impl ────────────────────────────────────────────────────────

impl HandleStore for SqliteStore {
  type Error = Error;

  // ── Handles ───────────────────────────────────────────────────────────────

  async fn create_handle(
    &self,
    handle: &str,
    profile: ProfileSnapshot,
  ) -> Result<HandleRecord> {
    let now = Utc::now();
    let record = HandleRecord {
      id:            Uuid::new_v4(),
      handle:        handle.to_string(),
      status:        HandleStatus::Pending,
      profile:       Some(profile),
      error_message: None,
      created_at:    now,
      updated_at:    now,
    };

    let id_str      = encode_uuid(record.id);
    let handle_str  = record.handle.clone();
    let status_str  = encode_status(record.status).to_owned();
    let profile_str = record.profile.as_ref().map(encode_profile).transpose()?;
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO handles (
             handle_id, handle, status, profile_json, error_message,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
          rusqlite::params![id_str, handle_str, status_str, profile_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.emit(StoreEvent::HandleChanged { id: record.id });
    Ok(record)
  }

  async fn get_handle(&self, id: Uuid) -> Result<Option<HandleRecord>> {
    self
      .query_one_handle(
        format!("SELECT {HANDLE_COLUMNS} FROM handles WHERE handle_id = ?1"),
        encode_uuid(id),
      )
      .await
  }

  async fn find_by_handle(&self, handle: &str) -> Result<Option<HandleRecord>> {
    self
      .query_one_handle(
        format!(
          "SELECT {HANDLE_COLUMNS} FROM handles \
           WHERE handle = ?1 COLLATE NOCASE"
        ),
        handle.to_string(),
      )
      .await
  }

  async fn set_status(
    &self,
    id: Uuid,
    status: HandleStatus,
    error_message: Option<String>,
  ) -> Result<()> {
    let id_str     = encode_uuid(id);
    let status_str = encode_status(status).to_owned();
    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE handles
           SET status = ?1, error_message = ?2, updated_at = ?3
           WHERE handle_id = ?4",
          rusqlite::params![status_str, error_message, at_str, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::HandleNotFound(id));
    }

    self.emit(StoreEvent::HandleChanged { id });
    Ok(())
  }

  async fn try_begin_hydrating(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    // The status guard is the concurrency control: a second trigger for the
    // same handle matches zero rows while a run is in flight.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE handles
           SET status = 'hydrating', error_message = NULL, updated_at = ?1
           WHERE handle_id = ?2 AND status != 'hydrating'",
          rusqlite::params![at_str, id_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.emit(StoreEvent::HandleChanged { id });
    }
    Ok(changed > 0)
  }

  async fn set_updated_at(&self, id: Uuid, updated_at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE handles SET updated_at = ?1 WHERE handle_id = ?2",
          rusqlite::params![at_str, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::HandleNotFound(id));
    }

    self.emit(StoreEvent::HandleChanged { id });
    Ok(())
  }

  async fn delete_handle(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    // ON DELETE CASCADE removes the activity rows.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM handles WHERE handle_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.emit(StoreEvent::HandleChanged { id });
    }
    Ok(changed > 0)
  }

  // ── Activity ──────────────────────────────────────────────────────────────

  async fn insert_activity_batch(
    &self,
    handle_id: Uuid,
    rows: &[NewActivity],
  ) -> Result<()> {
    if rows.is_empty() {
      return Ok(());
    }

    let id_str = encode_uuid(handle_id);
    let encoded: Vec<(String, String)> = rows
      .iter()
      .map(|r| (r.collection.clone(), encode_dt(r.timestamp)))
      .collect();
    let count = encoded.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO activity (handle_id, collection, timestamp)
             VALUES (?1, ?2, ?3)",
          )?;
          for (collection, timestamp) in &encoded {
            stmt.execute(rusqlite::params![id_str, collection, timestamp])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    self.emit(StoreEvent::ActivityInserted { handle_id, rows: count });
    Ok(())
  }

  async fn insert_activity(&self, handle_id: Uuid, row: &NewActivity) -> Result<bool> {
    let id_str         = encode_uuid(handle_id);
    let collection_str = row.collection.clone();
    let ts_str         = encode_dt(row.timestamp);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO activity (handle_id, collection, timestamp)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, collection_str, ts_str],
        )?)
      })
      .await?;

    if changed > 0 {
      self.emit(StoreEvent::ActivityInserted { handle_id, rows: 1 });
    }
    Ok(changed > 0)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn daily_counts(
    &self,
    handle_id: Uuid,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<DailyCount>> {
    let id_str    = encode_uuid(handle_id);
    let since_str = encode_dt(since);
    let until_str = encode_dt(until);

    let raw: Vec<(String, u64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT substr(timestamp, 1, 10) AS day, COUNT(*)
           FROM activity
           WHERE handle_id = ?1 AND timestamp >= ?2 AND timestamp < ?3
           GROUP BY day
           ORDER BY day",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, since_str, until_str], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raw
      .into_iter()
      .map(|(day_str, count)| {
        let day = NaiveDate::parse_from_str(&day_str, "%Y-%m-%d")
          .map_err(|e| Error::Decode(format!("day {day_str:?}: {e}")))?;
        Ok(DailyCount { day, count })
      })
      .collect()
  }

  async fn collection_totals(&self, handle_id: Uuid) -> Result<Vec<CollectionTotal>> {
    let id_str = encode_uuid(handle_id);

    let raw: Vec<(String, u64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT collection, COUNT(*)
           FROM activity
           WHERE handle_id = ?1
           GROUP BY collection
           ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      raw
        .into_iter()
        .map(|(collection, total)| CollectionTotal { collection, total })
        .collect(),
    )
  }

  async fn activity_count(&self, handle_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(handle_id);

    let count: u64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM activity WHERE handle_id = ?1",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count)
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
    self.events.subscribe()
  }
}

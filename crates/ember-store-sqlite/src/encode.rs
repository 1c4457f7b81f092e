//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. The profile snapshot is
//! stored as compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use ember_core::handle::{HandleRecord, HandleStatus, ProfileSnapshot};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── HandleStatus ────────────────────────────────────────────────────────────

pub fn encode_status(s: HandleStatus) -> &'static str {
  match s {
    HandleStatus::Pending => "pending",
    HandleStatus::Hydrating => "hydrating",
    HandleStatus::Complete => "complete",
    HandleStatus::Error => "error",
  }
}

pub fn decode_status(s: &str) -> Result<HandleStatus> {
  match s {
    "pending" => Ok(HandleStatus::Pending),
    "hydrating" => Ok(HandleStatus::Hydrating),
    "complete" => Ok(HandleStatus::Complete),
    "error" => Ok(HandleStatus::Error),
    other => Err(Error::Decode(format!("unknown status: {other:?}"))),
  }
}

// ─── ProfileSnapshot ─────────────────────────────────────────────────────────

pub fn encode_profile(p: &ProfileSnapshot) -> Result<String> {
  Ok(serde_json::to_string(p)?)
}

pub fn decode_profile(s: &str) -> Result<ProfileSnapshot> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `handles` row.
pub struct RawHandle {
  pub handle_id:     String,
  pub handle:        String,
  pub status:        String,
  pub profile_json:  Option<String>,
  pub error_message: Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawHandle {
  pub fn into_record(self) -> Result<HandleRecord> {
    Ok(HandleRecord {
      id:            decode_uuid(&self.handle_id)?,
      handle:        self.handle,
      status:        decode_status(&self.status)?,
      profile:       self
        .profile_json
        .as_deref()
        .map(decode_profile)
        .transpose()?,
      error_message: self.error_message,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

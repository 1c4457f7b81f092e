//! Handle records — the tracked identities.
//!
//! A handle record is the unit of observation: one row per case-insensitive
//! handle, carrying the hydration status the front end watches and a cached
//! profile snapshot so lookups don't re-resolve the identity on every view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a handle record.
///
/// Transitions are driven by the hydration orchestrator:
/// `Pending → Hydrating → Complete`, with a side exit to `Error` from either
/// non-terminal state. A later delta run re-enters `Hydrating` from
/// `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleStatus {
  Pending,
  Hydrating,
  Complete,
  Error,
}

impl HandleStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Complete | Self::Error)
  }
}

// ─── Profile snapshot ────────────────────────────────────────────────────────

/// Profile data cached at lookup time, straight from the identity's network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
  /// The stable decentralized identifier the handle resolved to.
  pub did:          String,
  /// The handle as resolved (already normalised).
  pub handle:       String,
  pub display_name: Option<String>,
  pub description:  Option<String>,
  /// Fully-qualified avatar URL, if the profile has one.
  pub avatar:       Option<String>,
}

// ─── Handle record ───────────────────────────────────────────────────────────

/// A tracked handle with its hydration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleRecord {
  pub id:            Uuid,
  /// Normalised handle string; unique case-insensitively.
  pub handle:        String,
  pub status:        HandleStatus,
  pub profile:       Option<ProfileSnapshot>,
  pub error_message: Option<String>,
  pub created_at:    DateTime<Utc>,
  /// High-water mark for delta synchronisation. Bumped on every status
  /// write; reset to start-of-day after a successful delta run.
  pub updated_at:    DateTime<Utc>,
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Normalise user input into the canonical handle form: trimmed, leading `@`
/// stripped, lowercased.
///
/// Returns [`Error::InvalidHandle`] when nothing is left after trimming.
pub fn normalize_handle(input: &str) -> Result<String> {
  let cleaned = input.trim().trim_start_matches('@').to_lowercase();
  if cleaned.is_empty() {
    return Err(Error::InvalidHandle(input.to_string()));
  }
  Ok(cleaned)
}

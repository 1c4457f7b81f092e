//! Traits for the remote side of hydration: identity resolution and
//! repository listing.
//!
//! The traits are implemented by `ember-atproto` against the real network.
//! The pipeline (`ember-hydrate`) depends on these abstractions only, so its
//! tests substitute in-memory fakes.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::handle::ProfileSnapshot;

// ─── Resolution ──────────────────────────────────────────────────────────────

/// The outcome of resolving a handle: a stable identifier plus the network
/// location of the service hosting that identity's repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
  pub did: String,
  /// Base URL of the personal data server holding the repository.
  pub pds: String,
}

/// Resolves a handle to a [`ResolvedIdentity`].
///
/// Resolution is all-or-nothing: implementations fail when the handle has no
/// identifier, the identifier has no document, or the document names no
/// hosting service. It runs once per hydration run, not per collection.
pub trait IdentityResolver: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn resolve<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Result<ResolvedIdentity, Self::Error>> + Send + 'a;
}

// ─── Repository listing ──────────────────────────────────────────────────────

/// One page of raw records from a remote repository.
///
/// Records are opaque JSON values; the pipeline digs the timestamp field out
/// itself. `cursor` is absent when the collection is exhausted.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
  pub records: Vec<serde_json::Value>,
  pub cursor:  Option<String>,
}

/// Capability the lookup surface needs from a profile error: telling the
/// refusals that get distinct user-facing responses apart from plain
/// transport failures.
pub trait ProfileError: std::error::Error {
  /// The subject has opted out of being shown to logged-out viewers.
  fn is_opt_out(&self) -> bool;
  /// The handle does not resolve to an identity.
  fn is_resolution(&self) -> bool;
}

/// Fetches a display-profile snapshot for a handle, enforcing the subject's
/// visibility preferences.
pub trait ProfileSource: Send + Sync {
  type Error: ProfileError + Send + Sync + 'static;

  fn get_profile<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Result<ProfileSnapshot, Self::Error>> + Send + 'a;
}

/// Lists records from an identity's repository, one collection at a time.
pub trait RepoHost: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch one page of `collection` records from `identity`'s repository.
  ///
  /// Pages are remote-ordered; the pipeline assumes newest-first (see the
  /// fetcher's documentation for the consequences if that does not hold).
  fn list_records<'a>(
    &'a self,
    identity: &'a ResolvedIdentity,
    collection: &'a str,
    limit: u32,
    cursor: Option<&'a str>,
  ) -> impl Future<Output = Result<RecordPage, Self::Error>> + Send + 'a;
}

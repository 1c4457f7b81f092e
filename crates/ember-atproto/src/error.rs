//! Error type for `ember-atproto`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  // ── Resolution failures — fatal for a hydration run ────────────────────
  #[error("unable to resolve DID for handle: {0}")]
  NoDid(String),

  #[error("unable to resolve DID document for DID: {0}")]
  NoDidDocument(String),

  #[error("unsupported DID method: {0}")]
  UnsupportedDidMethod(String),

  #[error("no PDS found in DID document for DID: {0}")]
  NoPds(String),

  // ── Lookup-time refusal, surfaced before any run starts ────────────────
  #[error("this account has opted out of public indexing")]
  OptOut,

  // ── Transport / protocol ───────────────────────────────────────────────
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{context} returned {status}")]
  UnexpectedStatus {
    context: String,
    status:  reqwest::StatusCode,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  /// Whether this error belongs to the resolution family (handle, document,
  /// or hosting location could not be determined).
  pub fn is_resolution(&self) -> bool {
    matches!(
      self,
      Error::NoDid(_)
        | Error::NoDidDocument(_)
        | Error::UnsupportedDidMethod(_)
        | Error::NoPds(_)
    )
  }
}

impl ember_core::remote::ProfileError for Error {
  fn is_opt_out(&self) -> bool { matches!(self, Error::OptOut) }

  fn is_resolution(&self) -> bool { Error::is_resolution(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

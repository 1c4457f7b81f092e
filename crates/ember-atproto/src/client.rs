//! [`AtprotoClient`] — XRPC client implementing [`IdentityResolver`],
//! [`ProfileSource`], and [`RepoHost`] against the live network.

use std::time::Duration;

use ember_core::{
  handle::ProfileSnapshot,
  remote::{
    IdentityResolver, ProfileSource, RecordPage, RepoHost, ResolvedIdentity,
  },
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{Error, Result};

/// Label an account sets to opt out of being shown to logged-out viewers.
/// We honour it by refusing to index the account at all.
const NO_UNAUTHENTICATED_LABEL: &str = "!no-unauthenticated";

const PROFILE_COLLECTION: &str = "app.bsky.actor.profile";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Endpoints the client talks to. Overridable for self-hosted directories
/// and for tests pointed at a local stub server.
#[derive(Debug, Clone)]
pub struct AtprotoConfig {
  /// Public appview, used for handle resolution and the opt-out check.
  pub appview_url:       String,
  /// PLC directory for `did:plc` document resolution.
  pub plc_directory_url: String,
  /// Image CDN used to build avatar URLs from blob references.
  pub cdn_url:           String,
}

impl Default for AtprotoConfig {
  fn default() -> Self {
    Self {
      appview_url:       "https://public.api.bsky.app".into(),
      plc_directory_url: "https://plc.directory".into(),
      cdn_url:           "https://cdn.bsky.app".into(),
    }
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ResolveHandleResponse {
  did: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidDocument {
  #[serde(default)]
  service: Vec<DidService>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidService {
  id:               String,
  #[serde(rename = "type")]
  service_type:     String,
  service_endpoint: String,
}

#[derive(Deserialize)]
struct ListRecordsResponse {
  records: Vec<ListedRecord>,
  cursor:  Option<String>,
}

#[derive(Deserialize)]
struct ListedRecord {
  value: serde_json::Value,
}

#[derive(Default, Deserialize)]
struct GetRecordResponse {
  value: serde_json::Value,
}

#[derive(Deserialize)]
struct LabeledProfile {
  #[serde(default)]
  labels: Vec<Label>,
}

#[derive(Deserialize)]
struct Label {
  val: String,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// XRPC client for identity resolution, profile lookup, and repository
/// listing.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct AtprotoClient {
  client: Client,
  config: AtprotoConfig,
}

impl AtprotoClient {
  pub fn new(config: AtprotoConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, config })
  }

  fn xrpc(&self, base: &str, method: &str) -> String {
    format!("{}/xrpc/{method}", base.trim_end_matches('/'))
  }

  async fn get_json<T: serde::de::DeserializeOwned>(
    &self,
    url: &str,
    query: &[(&str, &str)],
    context: &str,
  ) -> Result<T> {
    let resp = self.client.get(url).query(query).send().await?;
    if !resp.status().is_success() {
      return Err(Error::UnexpectedStatus {
        context: context.to_string(),
        status:  resp.status(),
      });
    }
    Ok(resp.json().await?)
  }

  // ── Resolution steps ──────────────────────────────────────────────────────

  /// Resolve a handle to its DID via the appview.
  pub async fn resolve_did(&self, handle: &str) -> Result<String> {
    let url = self.xrpc(&self.config.appview_url, "com.atproto.identity.resolveHandle");
    let resp = self
      .client
      .get(&url)
      .query(&[("handle", handle)])
      .send()
      .await?;

    if resp.status() == StatusCode::BAD_REQUEST || resp.status() == StatusCode::NOT_FOUND {
      return Err(Error::NoDid(handle.to_string()));
    }
    if !resp.status().is_success() {
      return Err(Error::UnexpectedStatus {
        context: "resolveHandle".into(),
        status:  resp.status(),
      });
    }

    let body: ResolveHandleResponse = resp.json().await?;
    Ok(body.did)
  }

  /// Fetch the DID document for a `did:plc` or `did:web` identifier.
  async fn fetch_did_document(&self, did: &str) -> Result<DidDocument> {
    let url = if did.starts_with("did:plc:") {
      format!("{}/{did}", self.config.plc_directory_url.trim_end_matches('/'))
    } else if let Some(domain) = did.strip_prefix("did:web:") {
      format!("https://{domain}/.well-known/did.json")
    } else {
      return Err(Error::UnsupportedDidMethod(did.to_string()));
    };

    let resp = self.client.get(&url).send().await?;
    if !resp.status().is_success() {
      return Err(Error::NoDidDocument(did.to_string()));
    }
    Ok(resp.json().await?)
  }

  /// Extract the PDS endpoint from a DID document.
  fn pds_from_document(did: &str, doc: &DidDocument) -> Result<String> {
    doc
      .service
      .iter()
      .find(|s| {
        s.id.ends_with("#atproto_pds")
          || s.service_type == "AtprotoPersonalDataServer"
      })
      .map(|s| s.service_endpoint.clone())
      .ok_or_else(|| Error::NoPds(did.to_string()))
  }

  // ── Profile lookup ────────────────────────────────────────────────────────

  /// Whether the account carries the opt-out label.
  async fn has_opt_out_label(&self, handle: &str) -> Result<bool> {
    let url = self.xrpc(&self.config.appview_url, "app.bsky.actor.getProfile");
    let profile: LabeledProfile = self
      .get_json(&url, &[("actor", handle)], "getProfile")
      .await?;
    Ok(
      profile
        .labels
        .iter()
        .any(|l| l.val == NO_UNAUTHENTICATED_LABEL),
    )
  }

  /// Fetch the profile for `handle`, honouring the opt-out label.
  ///
  /// The display fields come from the `app.bsky.actor.profile` record in the
  /// account's own repository; the avatar URL is assembled from the record's
  /// blob reference. A transport failure during the label check is logged
  /// and ignored so appview outages don't block access, matching the
  /// all-or-nothing contract only for resolution itself.
  pub async fn get_profile(&self, handle: &str) -> Result<ProfileSnapshot> {
    let identity = self.resolve(handle).await?;

    match self.has_opt_out_label(handle).await {
      Ok(true) => return Err(Error::OptOut),
      Ok(false) => {}
      Err(e) => {
        tracing::warn!(handle, error = %e, "opt-out label check failed; continuing");
      }
    }

    let url = self.xrpc(&identity.pds, "com.atproto.repo.getRecord");
    let record: GetRecordResponse = match self
      .get_json(
        &url,
        &[
          ("repo", identity.did.as_str()),
          ("collection", PROFILE_COLLECTION),
          ("rkey", "self"),
        ],
        "getRecord(profile)",
      )
      .await
    {
      Ok(record) => record,
      // Accounts without a profile record are still trackable; the display
      // fields just stay empty.
      Err(Error::UnexpectedStatus { .. }) => GetRecordResponse::default(),
      Err(e) => return Err(e),
    };

    let value = &record.value;
    let avatar = self.avatar_url(&identity.did, value);

    Ok(ProfileSnapshot {
      did:          identity.did,
      handle:       handle.to_string(),
      display_name: value
        .get("displayName")
        .and_then(|v| v.as_str())
        .map(str::to_owned),
      description:  value
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::to_owned),
      avatar,
    })
  }

  /// Build a CDN avatar URL from the profile record's blob reference.
  fn avatar_url(&self, did: &str, profile: &serde_json::Value) -> Option<String> {
    let blob = profile.get("avatar")?;
    let cid = blob.get("ref")?.get("$link")?.as_str()?;
    let extension = match blob.get("mimeType")?.as_str()? {
      "image/png" => "png",
      "image/gif" => "gif",
      "image/webp" => "webp",
      _ => "jpeg",
    };
    Some(format!(
      "{}/img/avatar/plain/{did}/{cid}@{extension}",
      self.config.cdn_url.trim_end_matches('/')
    ))
  }
}

// ─── Trait impls ─────────────────────────────────────────────────────────────

impl IdentityResolver for AtprotoClient {
  type Error = Error;

  async fn resolve(&self, handle: &str) -> Result<ResolvedIdentity> {
    let did = self.resolve_did(handle).await?;
    let doc = self.fetch_did_document(&did).await?;
    let pds = Self::pds_from_document(&did, &doc)?;
    Ok(ResolvedIdentity { did, pds })
  }
}

impl ProfileSource for AtprotoClient {
  type Error = Error;

  async fn get_profile(&self, handle: &str) -> Result<ProfileSnapshot> {
    AtprotoClient::get_profile(self, handle).await
  }
}

impl RepoHost for AtprotoClient {
  type Error = Error;

  async fn list_records(
    &self,
    identity: &ResolvedIdentity,
    collection: &str,
    limit: u32,
    cursor: Option<&str>,
  ) -> Result<RecordPage> {
    let url = self.xrpc(&identity.pds, "com.atproto.repo.listRecords");
    let limit_str = limit.to_string();

    let mut query: Vec<(&str, &str)> = vec![
      ("repo", identity.did.as_str()),
      ("collection", collection),
      ("limit", &limit_str),
    ];
    if let Some(c) = cursor {
      query.push(("cursor", c));
    }

    let body: ListRecordsResponse = self
      .get_json(&url, &query, "listRecords")
      .await?;

    Ok(RecordPage {
      records: body.records.into_iter().map(|r| r.value).collect(),
      cursor:  body.cursor,
    })
  }
}

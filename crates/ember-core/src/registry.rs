//! The collection registry — display metadata for every supported
//! record-collection type.
//!
//! The registry is an injected, immutable table rather than module-level
//! shared state, so tests can substitute a smaller one. Adding support for a
//! new app means adding one [`CollectionDescriptor`] entry here and nothing
//! else.

use serde::{Deserialize, Serialize};

/// Colour used when a collection has no registry entry.
pub const DEFAULT_COLOR: &str = "#6B7280";

// ─── Descriptor ──────────────────────────────────────────────────────────────

/// Display metadata for one application, possibly spanning several collection
/// NSIDs (e.g. a photo app with separate photo and gallery collections).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
  /// Full collection NSIDs grouped under this descriptor.
  pub collections:     Vec<String>,
  /// Human-readable app name.
  pub display_name:    String,
  /// Field inside each record value that holds the creation timestamp
  /// (consistent within the group).
  pub timestamp_field: String,
  /// Hex colour for UI display.
  pub color:           String,
}

impl CollectionDescriptor {
  pub fn new(
    collections: &[&str],
    display_name: &str,
    timestamp_field: &str,
    color: &str,
  ) -> Self {
    Self {
      collections:     collections.iter().map(|s| s.to_string()).collect(),
      display_name:    display_name.to_string(),
      timestamp_field: timestamp_field.to_string(),
      color:           color.to_string(),
    }
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Immutable lookup table over [`CollectionDescriptor`]s.
#[derive(Debug, Clone)]
pub struct CollectionRegistry {
  descriptors: Vec<CollectionDescriptor>,
}

impl CollectionRegistry {
  /// Build a registry from an explicit descriptor list. Used by tests and by
  /// anyone embedding the pipeline with a custom collection set.
  pub fn new(descriptors: Vec<CollectionDescriptor>) -> Self {
    Self { descriptors }
  }

  /// The full built-in table of supported apps.
  pub fn builtin() -> Self {
    let d = CollectionDescriptor::new;
    Self::new(vec![
      d(&["app.bsky.feed.post"], "Bluesky", "createdAt", "#1DA1F2"),
      d(&["pub.leaflet.document"], "Leaflet", "publishedAt", "#10B981"),
      d(&["com.whtwnd.blog.entry"], "WhiteWind", "createdAt", "#F3F4F6"),
      d(
        &["events.smokesignal.calendar.event"],
        "Smoke Signal",
        "createdAt",
        "#0AD0B2",
      ),
      d(
        &["fyi.unravel.frontpage.post"],
        "Frontpage",
        "createdAt",
        "#7C85FF",
      ),
      d(
        &["exchange.recipe.recipe"],
        "Recipe Exchange",
        "createdAt",
        "#F59E0B",
      ),
      d(&["so.sprk.feed.post"], "Sprk", "createdAt", "#A855F7"),
      d(
        &["social.popfeed.feed.review"],
        "PopFeed",
        "createdAt",
        "#EAB308",
      ),
      d(
        &["sh.tangled.repo", "sh.tangled.string"],
        "Tangled",
        "createdAt",
        "#475569",
      ),
      d(&["fm.plyr.track"], "Plyr", "createdAt", "#EF4444"),
      d(
        &["app.sidetrail.trail", "app.sidetrail.completion"],
        "Sidetrail",
        "createdAt",
        "#22C55E",
      ),
      d(&["community.nooki.posts"], "Nooki", "createdAt", "#F97316"),
      d(
        &["social.grain.photo", "social.grain.gallery"],
        "Grain",
        "createdAt",
        "#CA8A04",
      ),
      d(
        &["app.dropanchor.checkin"],
        "DropAnchor",
        "createdAt",
        "#06B6D4",
      ),
      d(
        &["app.beaconbits.beacon"],
        "BeaconBits",
        "createdAt",
        "#F59E0B",
      ),
      d(&["social.kibun.status"], "Kibun", "createdAt", "#84CC16"),
      d(
        &["io.zzstoatzz.status.record"],
        "status",
        "createdAt",
        "#6366F1",
      ),
    ])
  }

  /// Find the descriptor covering a collection NSID.
  ///
  /// Consumers fall back to the raw NSID as display name and
  /// [`DEFAULT_COLOR`] when this returns `None`.
  pub fn descriptor_for(&self, collection: &str) -> Option<&CollectionDescriptor> {
    self
      .descriptors
      .iter()
      .find(|d| d.collections.iter().any(|c| c == collection))
  }

  /// Iterate over all descriptors; drives the per-collection fetch loop.
  pub fn iter(&self) -> impl Iterator<Item = &CollectionDescriptor> {
    self.descriptors.iter()
  }

  /// Every registered collection NSID, flattened across groups.
  pub fn collection_names(&self) -> Vec<&str> {
    self
      .descriptors
      .iter()
      .flat_map(|d| d.collections.iter().map(String::as_str))
      .collect()
  }

  pub fn len(&self) -> usize { self.descriptors.len() }

  pub fn is_empty(&self) -> bool { self.descriptors.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_lookup_by_nsid() {
    let reg = CollectionRegistry::builtin();
    let desc = reg.descriptor_for("app.bsky.feed.post").unwrap();
    assert_eq!(desc.display_name, "Bluesky");
    assert_eq!(desc.timestamp_field, "createdAt");
  }

  #[test]
  fn grouped_nsids_share_a_descriptor() {
    let reg = CollectionRegistry::builtin();
    let a = reg.descriptor_for("sh.tangled.repo").unwrap();
    let b = reg.descriptor_for("sh.tangled.string").unwrap();
    assert_eq!(a.display_name, b.display_name);
    assert_eq!(a.color, b.color);
  }

  #[test]
  fn unknown_nsid_returns_none() {
    let reg = CollectionRegistry::builtin();
    assert!(reg.descriptor_for("com.example.unknown").is_none());
  }

  #[test]
  fn collection_names_flattens_groups() {
    let reg = CollectionRegistry::new(vec![
      CollectionDescriptor::new(&["a.b.c", "a.b.d"], "AB", "createdAt", "#000000"),
      CollectionDescriptor::new(&["x.y.z"], "XY", "publishedAt", "#FFFFFF"),
    ]);
    assert_eq!(reg.collection_names(), vec!["a.b.c", "a.b.d", "x.y.z"]);
  }
}

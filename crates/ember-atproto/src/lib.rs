//! AT Protocol client for Ember.
//!
//! Implements the remote side of hydration over plain XRPC with [`reqwest`]:
//! handle → DID → DID document → PDS resolution, profile lookup with the
//! opt-out label check, and paged repository listing.

mod client;

pub mod error;

pub use client::{AtprotoClient, AtprotoConfig};
pub use error::{Error, Result};

//! Core types and trait definitions for the Ember activity heatmap.
//!
//! No HTTP or database code lives here. The storage and remote seams are
//! traits whose methods return explicit `Send` futures; implementations
//! write them as plain `async fn` and the pipeline stays backend-agnostic.

pub mod activity;
pub mod error;
pub mod handle;
pub mod registry;
pub mod remote;
pub mod store;

pub use error::{Error, Result};

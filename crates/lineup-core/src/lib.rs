//! lineup-core library.
//!
//! Hierarchical ordering and relationship reconciliation over a dataset
//! snapshot:
//!
//! - [`order`] merges persisted orders with the current keys and tracks
//!   working and saved lists per scope.
//! - [`selection`] decides which items are selected for a target.
//! - [`reconcile`] turns a selection into edge creates and deletes.
//! - [`sort`] builds the presentation comparator.
//! - [`session`] wires them to a [`prefs::PreferenceStore`] and an
//!   [`edges::EdgeStore`].

pub mod config;
pub mod edges;
pub mod error;
pub mod lock;
pub mod model;
pub mod order;
pub mod prefs;
pub mod reconcile;
pub mod selection;
pub mod session;
pub mod sort;

/// # Conventions
///
/// - **Errors**: module errors are `thiserror` enums with a `code()`;
///   `anyhow::Result` only in config loading.
/// - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).
pub use error::ErrorCode;

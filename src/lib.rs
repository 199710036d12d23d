//! Workspace entry crate.
//!
//! Re-exports the photo sync service so host applications can depend on
//! `photos-sync-workspace` and pick the bridge set through features instead
//! of wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;

//! HTTP API handlers for folio-timeline
//!
//! Diagnostics (health, stats, cache control) and read-only timeline data.

pub mod diagnostics;
pub mod timeline;

pub use diagnostics::diagnostics_routes;
pub use timeline::timeline_routes;

//! Snapshot engine for the stackmon compose dashboard.
//!
//! The engine resolves an immutable monitoring configuration at
//! startup, then rebuilds an ordered, grouped table model on a timer
//! or manual trigger. Rendering lives entirely behind
//! [`refresh::ModelSink`]; toolkit adapters implement only the sink.

pub mod backend;
pub mod cache;
pub mod classify;
pub mod context;
pub mod group;
pub mod model;
pub mod probe;
pub mod refresh;
pub mod snapshot;

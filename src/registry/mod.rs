//! Store definitions, live instances, and the process-wide directory.
//!
//! A `StoreDef` is an immutable descriptor (initial state plus actions)
//! whose identity, not value, keys the registry. The registry constructs a
//! `StoreInstance` lazily per `(definition, scope)` pair, reference-counts
//! it, and tears scoped instances down when the last consumer releases
//! them.

mod definition;
mod instance;
mod registry;

pub use definition::{DefId, ScopeKey, StoreDef};
pub use instance::StoreInstance;
pub use registry::StoreRegistry;

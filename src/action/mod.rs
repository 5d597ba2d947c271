//! Action binding: from user-authored creators to plain callables.
//!
//! An action-creator takes its call arguments and returns a body; the body
//! runs against a [`StoreApi`] exposing state access and dispatch. Binding
//! erases each creator's argument type so every action of a store lives in
//! one mapping and can be invoked (and composed) by name.

mod binder;

pub use binder::{ActionSet, BoundActions, StoreApi};

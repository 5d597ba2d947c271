//! # Canister
//!
//! A selector-based state management runtime for Rust.
//!
//! Canister lets independent consumers (typically view-binding adapters)
//! share externally-mutable state containers and be informed only when the
//! slice of state they care about actually changes:
//!
//! - `StoreDef` / `StoreRegistry` - identity-keyed, reference-counted
//!   directory of live store instances, with optional per-container scoping
//! - `BoundActions` - user-authored action creators turned into plain
//!   callables that mutate state and notify listeners synchronously
//! - `Subscription` - the change-detection engine: selector recomputation,
//!   shallow-equality suppression, and input-level memoization
//!
//! State is held as `Arc<S>` and replaced wholesale on every mutation, so
//! pointer equality is the transition-detection primitive. `StoreState`
//! itself never deduplicates notifications; deciding whether a consumer
//! must re-render is the subscription engine's job.

pub mod action;
pub mod error;
pub mod registry;
pub mod state;
pub mod subscription;

// Re-export main types for convenience
pub use action::{ActionSet, BoundActions, StoreApi};
pub use error::StoreError;
pub use registry::{ScopeKey, StoreDef, StoreInstance, StoreRegistry};
pub use state::{ListenerHandle, StoreState};
pub use subscription::{Selected, ShallowEq, Subscription};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let registry = StoreRegistry::new();
        let def = StoreDef::new("smoke", 0i64).action("set", |value: i64| {
            move |api: &StoreApi<i64>| {
                api.set(value);
                Ok(())
            }
        });

        let store = registry.get_store(&def, None).unwrap();
        assert_eq!(*store.state().get(), 0);
        store.actions().dispatch("set", 42i64).unwrap();
        assert_eq!(*store.state().get(), 42);
    }
}

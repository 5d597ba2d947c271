//! Error taxonomy for the registry and action dispatch.

use thiserror::Error;

/// Errors surfaced by store construction and action dispatch.
///
/// Panics raised inside user selectors or action bodies are never caught;
/// they propagate synchronously to whoever triggered the operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The definition registers no actions; rejected at construction time.
    #[error("store `{store}` defines no actions")]
    MisconfiguredStore {
        /// Name of the offending store definition.
        store: &'static str,
    },

    /// Dispatch of an action name the definition never registered.
    #[error("store `{store}` has no action named `{action}`")]
    UnknownAction {
        /// Name of the store the dispatch targeted.
        store: &'static str,
        /// The unregistered action name.
        action: String,
    },

    /// Dispatch payload type does not match the creator's argument type.
    #[error("action `{action}` on store `{store}` called with mismatched arguments")]
    ActionArguments {
        /// Name of the store the dispatch targeted.
        store: &'static str,
        /// The action whose arguments failed to downcast.
        action: String,
    },

    /// Action dispatch through an instance the registry already destroyed.
    #[error("store `{store}` instance was torn down")]
    TornDown {
        /// Name of the destroyed store.
        store: &'static str,
    },
}

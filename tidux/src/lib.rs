//! tidux: minimal unidirectional action dispatch
//!
//! Actions run, their outcome is broadcast to subscribers, and selector
//! bindings re-render their owner only when the selected slice changed.
//! Asynchronous actions share a cancellation token with everything they
//! dispatch, so a whole action tree can be abandoned at once.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use tidux::prelude::*;
//!
//! #[derive(Selection, Clone)]
//! struct CounterView {
//!     count: i32,
//!     label: Arc<str>,
//! }
//!
//! let label: Arc<str> = Arc::from("clicks");
//! let a = CounterView { count: 1, label: label.clone() };
//! let b = CounterView { count: 1, label };
//! assert!(a.same_as(&b));
//! ```

// Re-export everything from core
pub use tidux_core::*;

// Re-export derive macros
pub use tidux_macros::Selection;

/// Prelude for convenient imports
pub mod prelude {
    // Actions and dispatch
    pub use tidux_core::{
        Action, ActionId, AsyncAction, CancelToken, DispatchContext, DispatchError, Dispatchable,
        Dispatcher, Marker, Subtask, SyncAction, Task, Until,
    };

    // Subscriptions
    pub use tidux_core::{Listener, ListenerParams, Subscription, SubscriptionGuard};

    // Selectors
    pub use tidux_core::{
        use_selector, Identity, RenderFlag, RenderHost, Selection, SelectorBinding, SelectorError,
    };

    // Debug
    pub use tidux_core::debug::{ActionLogConfig, ActionLogger, ActionLoggerConfig};

    // Derive macros
    pub use tidux_macros::Selection;
}

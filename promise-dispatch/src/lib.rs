//! promise-dispatch: Promise-carrying actions for Redux-style pipelines
//!
//! Dispatch an action whose payload holds a thenable under `promise` and the
//! middleware dispatches the pending action right away, then `<TYPE>_RESOLVED`
//! or `<TYPE>_REJECTED` once the thenable settles.
//!
//! # Example
//! ```ignore
//! use promise_dispatch::prelude::*;
//!
//! let store = Store::builder(AppState::default(), reducer)
//!     .with(PromiseMiddleware::new())
//!     .build();
//!
//! let handle = store.dispatch(
//!     Action::new("FETCH").with_payload(
//!         Record::new()
//!             .with(PROMISE_FIELD, Promise::spawn(load_page(2)))
//!             .with("page", 2),
//!     ),
//! )?;
//!
//! // Settles with the same outcome as the request
//! let page = handle.settled().expect("thenable").await;
//! ```

// Re-export everything from core
pub use promise_dispatch_core::*;

/// Prelude for convenient imports
pub mod prelude {
    // Values and actions
    pub use promise_dispatch_core::{action_type, is_standard_action, Action, Record, Value};

    // Promises
    pub use promise_dispatch_core::{
        Promise, PromiseMiddleware, Settlement, Settler, Thenable, PROMISE_FIELD,
    };

    // Naming
    pub use promise_dispatch_core::{reject, resolve, unreject, unresolve, Suffixes};

    // Store
    pub use promise_dispatch_core::{
        DispatchContext, DispatchError, DispatchResult, Dispatcher, LoggingMiddleware,
        Middleware, Next, NoopMiddleware, Pipeline, Reducer, Store,
    };

    // Debug
    pub use promise_dispatch_core::debug::{ActionLoggerConfig, ActionLoggerMiddleware};
}

//! Core traits and types for promise-dispatch
//!
//! This crate provides the building blocks for Redux-style dispatch pipelines
//! whose actions may carry asynchronous work.
//!
//! # Core Concepts
//!
//! - **Value**: Dynamic action data (records, lists, scalars, thenables)
//! - **Action**: Standard actions (`type`, `payload`, `meta`, `error`)
//! - **Promise**: A shareable thenable backed by a tokio task
//! - **Pipeline / Store**: Middleware chains ending in a base dispatch
//! - **PromiseMiddleware**: Pending and settlement actions for promise payloads
//!
//! # Basic Example
//!
//! ```ignore
//! use promise_dispatch_core::prelude::*;
//!
//! #[derive(Default)]
//! struct AppState {
//!     loading: bool,
//!     user: Option<Value>,
//! }
//!
//! fn reducer(state: &mut AppState, action: &Action) -> bool {
//!     match action.name() {
//!         "FETCH_USER" => { state.loading = true; true }
//!         "FETCH_USER_RESOLVED" => {
//!             state.loading = false;
//!             state.user = action.payload.clone();
//!             true
//!         }
//!         "FETCH_USER_REJECTED" => { state.loading = false; true }
//!         _ => false,
//!     }
//! }
//!
//! let store = Store::builder(AppState::default(), reducer)
//!     .with(PromiseMiddleware::new())
//!     .build();
//!
//! let request = Promise::spawn(async { Ok(Value::from("ada")) });
//! let handle = store.dispatch(
//!     Action::new("FETCH_USER").with_payload(Record::new().with(PROMISE_FIELD, request)),
//! )?;
//! ```
//!
//! # Settlement Naming
//!
//! Settlement action types are derived from the original type by suffix:
//!
//! ```
//! use promise_dispatch_core::{reject, resolve, unresolve};
//!
//! assert_eq!(resolve("FETCH_USER"), "FETCH_USER_RESOLVED");
//! assert_eq!(reject("FETCH_USER"), "FETCH_USER_REJECTED");
//! assert_eq!(unresolve("FETCH_USER_RESOLVED"), "FETCH_USER");
//! ```
//!
//! Reducers can match on `resolve("FETCH_USER")` instead of spelling out the
//! suffixed name, which keeps them correct under custom [`Suffixes`].

pub mod action;
pub mod debug;
pub mod error;
pub mod naming;
pub mod promise;
pub mod promise_middleware;
pub mod store;
pub mod testing;
pub mod value;

// Action exports
pub use action::{action_type, check_standard_action, is_standard_action, Action, ACTION_FIELDS};

// Error exports
pub use error::{ActionShapeError, DispatchError, TypeKindError};

// Naming exports
pub use naming::{
    reject, reject_with, resolve, resolve_with, unreject, unreject_with, unresolve,
    unresolve_with, Suffixes, REJECTED_SUFFIX, RESOLVED_SUFFIX,
};

// Promise exports
pub use promise::{OnFulfilled, OnRejected, Promise, Settlement, Settler, Thenable};
pub use promise_middleware::{PromiseMiddleware, PROMISE_FIELD};

// Store exports
pub use store::{
    BaseDispatch, DispatchContext, DispatchResult, Dispatcher, LoggingMiddleware, Middleware,
    Next, NoopMiddleware, Pipeline, PipelineBuilder, Reducer, Store, StoreBuilder,
};

// Value exports
pub use value::{Record, Value};

// Testing exports
pub use testing::{TestHarness, TestHarnessBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{action_type, is_standard_action, Action};
    pub use crate::debug::{ActionLoggerConfig, ActionLoggerMiddleware};
    pub use crate::error::DispatchError;
    pub use crate::naming::{reject, resolve, unreject, unresolve, Suffixes};
    pub use crate::promise::{Promise, Settlement, Settler, Thenable};
    pub use crate::promise_middleware::{PromiseMiddleware, PROMISE_FIELD};
    pub use crate::store::{
        DispatchContext, DispatchResult, Dispatcher, LoggingMiddleware, Middleware, Next,
        NoopMiddleware, Pipeline, Reducer, Store,
    };
    pub use crate::value::{Record, Value};
}

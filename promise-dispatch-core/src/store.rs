//! Middleware pipeline and centralized state store
//!
//! A [`Pipeline`] threads each dispatched value through an ordered chain of
//! [`Middleware`] and finally into a base sink. Each middleware sees three
//! things:
//!
//! - a [`DispatchContext`], whose `dispatch` re-enters the pipeline from the
//!   first middleware,
//! - a [`Next`], which hands the value to the remaining middleware,
//! - the value itself.
//!
//! [`Store`] is a pipeline whose sink is a reducer over shared state.
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch_core::{Action, LoggingMiddleware, PromiseMiddleware, Store};
//!
//! #[derive(Default)]
//! struct AppState {
//!     loading: bool,
//! }
//!
//! fn reducer(state: &mut AppState, action: &Action) -> bool {
//!     match action.name() {
//!         "FETCH" => { state.loading = true; true }
//!         "FETCH_RESOLVED" | "FETCH_REJECTED" => { state.loading = false; true }
//!         _ => false,
//!     }
//! }
//!
//! let store = Store::builder(AppState::default(), reducer)
//!     .with(LoggingMiddleware::new())
//!     .with(PromiseMiddleware::new())
//!     .build();
//!
//! store.dispatch(Action::new("FETCH"))?;
//! ```

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::action::{action_type, Action};
use crate::error::DispatchError;
use crate::value::Value;

/// Result of sending a value through a pipeline.
pub type DispatchResult = Result<Value, DispatchError>;

/// A reducer function that handles actions and mutates state
///
/// Returns `true` if the state changed.
pub type Reducer<S> = fn(&mut S, &Action) -> bool;

/// The sink at the end of a pipeline.
pub type BaseDispatch = Arc<dyn Fn(Value) -> DispatchResult + Send + Sync>;

/// Middleware trait for intercepting dispatched values
///
/// A middleware may forward the value with `next.run(..)`, forward a
/// transformed value, dispatch new values from the start of the pipeline with
/// `ctx.dispatch(..)`, or return without forwarding at all.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult;
}

struct Chain {
    middlewares: Vec<Arc<dyn Middleware>>,
    base: BaseDispatch,
    gate: DispatchGate,
}

/// Lets one thread at a time run a pipeline.
///
/// Re-entrant on the owning thread, so `ctx.dispatch` from inside a
/// middleware proceeds. A dispatch from any other thread, such as a
/// settlement continuation on a tokio worker, waits until the outermost
/// dispatch has returned.
#[derive(Default)]
struct DispatchGate {
    state: Mutex<GateState>,
    released: Condvar,
}

#[derive(Default)]
struct GateState {
    owner: Option<ThreadId>,
    depth: usize,
}

impl DispatchGate {
    fn enter(&self) -> GateGuard<'_> {
        let current = thread::current().id();
        let mut state = self.lock();
        while state.owner.is_some_and(|owner| owner != current) {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.owner = Some(current);
        state.depth += 1;
        GateGuard { gate: self }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Leaves the gate on drop, so a panicking middleware does not wedge it.
struct GateGuard<'a> {
    gate: &'a DispatchGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.lock();
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            self.gate.released.notify_all();
        }
    }
}

impl Chain {
    fn run(self: &Arc<Self>, index: usize, action: Value) -> DispatchResult {
        match self.middlewares.get(index) {
            Some(middleware) => {
                let ctx = DispatchContext {
                    dispatcher: Dispatcher {
                        chain: Arc::clone(self),
                    },
                };
                let next = Next {
                    chain: self,
                    index: index + 1,
                };
                middleware.handle(&ctx, next, action)
            }
            None => (self.base)(action),
        }
    }
}

/// Cloneable entry point into a pipeline.
///
/// Dispatching always starts at the first middleware. Safe to call from
/// asynchronous continuations on any thread: dispatches are serialized, and
/// one arriving from another thread runs after the current outermost
/// dispatch returns.
#[derive(Clone)]
pub struct Dispatcher {
    chain: Arc<Chain>,
}

impl Dispatcher {
    pub fn dispatch(&self, action: impl Into<Value>) -> DispatchResult {
        let _entered = self.chain.gate.enter();
        self.chain.run(0, action.into())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("middlewares_count", &self.chain.middlewares.len())
            .finish()
    }
}

/// What a middleware can reach besides its downstream.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    dispatcher: Dispatcher,
}

impl DispatchContext {
    /// Dispatch from the start of the pipeline, including middleware
    /// upstream of the caller.
    pub fn dispatch(&self, action: impl Into<Value>) -> DispatchResult {
        self.dispatcher.dispatch(action)
    }

    /// An owned handle for dispatching later, e.g. from a continuation.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }
}

/// The remainder of the pipeline after the current middleware.
pub struct Next<'a> {
    chain: &'a Arc<Chain>,
    index: usize,
}

impl Next<'_> {
    /// Forward to the next middleware, or to the sink if none are left.
    pub fn run(self, action: impl Into<Value>) -> DispatchResult {
        self.chain.run(self.index, action.into())
    }
}

/// An ordered middleware chain ending in a base sink.
#[derive(Debug, Clone)]
pub struct Pipeline {
    dispatcher: Dispatcher,
}

impl Pipeline {
    /// A pipeline with no middleware.
    pub fn new<F>(base: F) -> Self
    where
        F: Fn(Value) -> DispatchResult + Send + Sync + 'static,
    {
        Self::builder(base).build()
    }

    pub fn builder<F>(base: F) -> PipelineBuilder
    where
        F: Fn(Value) -> DispatchResult + Send + Sync + 'static,
    {
        PipelineBuilder {
            middlewares: Vec::new(),
            base: Arc::new(base),
        }
    }

    pub fn dispatch(&self, action: impl Into<Value>) -> DispatchResult {
        self.dispatcher.dispatch(action)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }
}

/// Collects middleware in run order.
pub struct PipelineBuilder {
    middlewares: Vec<Arc<dyn Middleware>>,
    base: BaseDispatch,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl PipelineBuilder {
    /// Append a middleware. Earlier middleware run first.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append an already shared middleware.
    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            dispatcher: Dispatcher {
                chain: Arc::new(Chain {
                    middlewares: self.middlewares,
                    base: self.base,
                    gate: DispatchGate::default(),
                }),
            },
        }
    }
}

/// Centralized state store with Redux-like reducer pattern
///
/// State lives behind a mutex so that actions dispatched from asynchronous
/// continuations reach the same state. The reducer runs at the end of the
/// middleware pipeline and the store's `dispatch` returns
/// `Value::Bool(changed)` unless a middleware returns something else.
///
/// # Example
/// ```ignore
/// #[derive(Default)]
/// struct AppState {
///     counter: i32,
/// }
///
/// fn reducer(state: &mut AppState, action: &Action) -> bool {
///     match action.name() {
///         "INCREMENT" => {
///             state.counter += 1;
///             true
///         }
///         _ => false,
///     }
/// }
///
/// let store = Store::new(AppState::default(), reducer);
/// store.dispatch(Action::new("INCREMENT"))?;
/// assert_eq!(store.state(|s| s.counter)?, 1);
/// ```
pub struct Store<S> {
    state: Arc<Mutex<S>>,
    pipeline: Pipeline,
}

impl<S: Send + 'static> Store<S> {
    /// Create a new store with initial state and reducer, without middleware
    pub fn new(state: S, reducer: Reducer<S>) -> Self {
        Self::builder(state, reducer).build()
    }

    /// Start building a store with middleware
    pub fn builder(state: S, reducer: Reducer<S>) -> StoreBuilder<S> {
        StoreBuilder {
            state,
            reducer,
            middlewares: Vec::new(),
        }
    }

    /// Dispatch an action through middleware and reducer
    pub fn dispatch(&self, action: impl Into<Value>) -> DispatchResult {
        self.pipeline.dispatch(action)
    }

    /// A cloneable handle dispatching into this store
    pub fn dispatcher(&self) -> Dispatcher {
        self.pipeline.dispatcher()
    }

    /// Read the current state
    pub fn state<R>(&self, read: impl FnOnce(&S) -> R) -> Result<R, DispatchError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| DispatchError::StatePoisoned)?;
        Ok(read(&guard))
    }

    /// Mutate the state directly
    ///
    /// Use this sparingly - prefer dispatching actions for state changes.
    pub fn state_mut<R>(&self, write: impl FnOnce(&mut S) -> R) -> Result<R, DispatchError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| DispatchError::StatePoisoned)?;
        Ok(write(&mut guard))
    }
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Collects a store's middleware in run order.
pub struct StoreBuilder<S> {
    state: S,
    reducer: Reducer<S>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl<S: Send + 'static> StoreBuilder<S> {
    /// Append a middleware. Earlier middleware run first.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append an already shared middleware.
    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn build(self) -> Store<S> {
        let state = Arc::new(Mutex::new(self.state));
        let reducer = self.reducer;

        let sink_state = Arc::clone(&state);
        let mut builder = Pipeline::builder(move |value: Value| {
            let action = Action::try_from(value)?;
            let mut guard = sink_state
                .lock()
                .map_err(|_| DispatchError::StatePoisoned)?;
            Ok(Value::Bool(reducer(&mut guard, &action)))
        });
        for middleware in self.middlewares {
            builder = builder.with_shared(middleware);
        }

        Store {
            state,
            pipeline: builder.build(),
        }
    }
}

/// A middleware that forwards everything unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl Middleware for NoopMiddleware {
    fn handle(&self, _ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
        next.run(action)
    }
}

/// Middleware that logs actions (for debugging)
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before forwarding
    pub log_before: bool,
    /// Whether to log after the rest of the pipeline returns
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl Middleware for LoggingMiddleware {
    fn handle(&self, _ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
        let name = action_type(&action).unwrap_or("<untyped>").to_string();
        if self.log_before {
            tracing::debug!(action = %name, "Dispatching action");
        }

        let result = next.run(action);

        if self.log_after {
            match &result {
                Ok(value) => tracing::debug!(action = %name, result = ?value, "Action processed"),
                Err(err) => tracing::debug!(action = %name, error = %err, "Action failed"),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionShapeError;
    use serde_json::json;

    #[derive(Default)]
    struct TestState {
        counter: i32,
    }

    fn test_reducer(state: &mut TestState, action: &Action) -> bool {
        match action.name() {
            "INCREMENT" => {
                state.counter += 1;
                true
            }
            "DECREMENT" => {
                state.counter -= 1;
                true
            }
            "PANIC" => panic!("reducer failure"),
            _ => false,
        }
    }

    #[test]
    fn test_store_dispatch() {
        let store = Store::new(TestState::default(), test_reducer);

        assert_eq!(store.dispatch(Action::new("INCREMENT")), Ok(Value::Bool(true)));
        assert_eq!(store.state(|s| s.counter), Ok(1));

        store.dispatch(Action::new("INCREMENT")).unwrap();
        store.dispatch(Action::new("DECREMENT")).unwrap();
        assert_eq!(store.state(|s| s.counter), Ok(1));
    }

    #[test]
    fn test_store_noop() {
        let store = Store::new(TestState::default(), test_reducer);

        assert_eq!(store.dispatch(Action::new("NOOP")), Ok(Value::Bool(false)));
        assert_eq!(store.state(|s| s.counter), Ok(0));
    }

    #[test]
    fn test_store_state_mut() {
        let store = Store::new(TestState::default(), test_reducer);

        store.state_mut(|s| s.counter = 100).unwrap();
        assert_eq!(store.state(|s| s.counter), Ok(100));
    }

    #[test]
    fn test_store_rejects_non_actions() {
        let store = Store::new(TestState::default(), test_reducer);

        let err = store.dispatch(json!({ "foo": "bar" })).unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidAction(ActionShapeError::UnknownField("foo".into()))
        );
    }

    #[test]
    fn test_store_poisoned_state() {
        let store = Store::new(TestState::default(), test_reducer);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.dispatch(Action::new("PANIC"))
        }));
        assert!(outcome.is_err());

        assert_eq!(
            store.dispatch(Action::new("INCREMENT")),
            Err(DispatchError::StatePoisoned)
        );
    }

    struct Tagging(&'static str);

    impl Middleware for Tagging {
        fn handle(&self, _ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
            let mut action = action;
            if let Some(record) = action.as_record_mut() {
                let mut trail = match record.get("meta") {
                    Some(Value::String(s)) => s.clone(),
                    _ => String::new(),
                };
                trail.push_str(self.0);
                record.insert("meta", trail);
            }
            next.run(action)
        }
    }

    fn recording_pipeline() -> (Pipeline, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pipeline = Pipeline::builder(move |value: Value| {
            sink.lock().unwrap().push(value);
            Ok(Value::Null)
        })
        .with(Tagging("a"))
        .with(Tagging("b"))
        .build();
        (pipeline, seen)
    }

    #[test]
    fn test_pipeline_runs_in_order() {
        let (pipeline, seen) = recording_pipeline();

        pipeline.dispatch(Action::new("X")).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("meta"), Some(&Value::from("ab")));
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn handle(&self, _ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
            if action_type(&action) == Some("BLOCKED") {
                return Ok(Value::from("blocked"));
            }
            next.run(action)
        }
    }

    /// Re-dispatches `PING` as `PONG` from the start of the pipeline.
    struct Redispatch;

    impl Middleware for Redispatch {
        fn handle(&self, ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
            if action_type(&action) == Some("PING") {
                return ctx.dispatch(Action::new("PONG"));
            }
            next.run(action)
        }
    }

    #[test]
    fn test_short_circuit() {
        let store = Store::builder(TestState::default(), test_reducer)
            .with(ShortCircuit)
            .build();

        assert_eq!(
            store.dispatch(Action::new("BLOCKED")),
            Ok(Value::from("blocked"))
        );
        assert_eq!(store.dispatch(Action::new("INCREMENT")), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_context_dispatch_starts_from_first_middleware() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pipeline = Pipeline::builder(move |value: Value| {
            sink.lock().unwrap().push(value);
            Ok(Value::Null)
        })
        .with(Tagging("up"))
        .with(Redispatch)
        .build();

        pipeline.dispatch(Action::new("PING")).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("type"), Some(&Value::from("PONG")));
        // Tagged by the upstream middleware on re-entry
        assert_eq!(seen[0].get("meta"), Some(&Value::from("up")));
    }

    #[test]
    fn test_noop_and_logging_forward() {
        let store = Store::builder(TestState::default(), test_reducer)
            .with(NoopMiddleware)
            .with(LoggingMiddleware::verbose())
            .build();

        assert_eq!(store.dispatch(Action::new("INCREMENT")), Ok(Value::Bool(true)));
        assert_eq!(store.state(|s| s.counter), Ok(1));
    }

    /// Holds `SLOW` for a while after the rest of the pipeline returns.
    struct SlowAfter(Arc<Mutex<Vec<String>>>);

    impl Middleware for SlowAfter {
        fn handle(&self, _ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
            let slow = action_type(&action) == Some("SLOW");
            let result = next.run(action);
            if slow {
                std::thread::sleep(std::time::Duration::from_millis(50));
                self.0.lock().unwrap().push("slow-returned".to_string());
            }
            result
        }
    }

    #[test]
    fn test_dispatch_from_other_thread_waits_for_outer_dispatch() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (reached_tx, reached_rx) = std::sync::mpsc::channel();
        let reached_tx = Mutex::new(reached_tx);

        let sink = Arc::clone(&order);
        let pipeline = Pipeline::builder(move |value: Value| {
            let name = action_type(&value).unwrap_or_default().to_string();
            if name == "SLOW" {
                reached_tx.lock().unwrap().send(()).unwrap();
            }
            sink.lock().unwrap().push(name);
            Ok(Value::Null)
        })
        .with(SlowAfter(Arc::clone(&order)))
        .build();

        // Dispatches while SLOW is still inside SlowAfter
        let dispatcher = pipeline.dispatcher();
        let other = std::thread::spawn(move || {
            reached_rx.recv().unwrap();
            dispatcher.dispatch(Action::new("OTHER")).unwrap();
        });

        pipeline.dispatch(Action::new("SLOW")).unwrap();
        other.join().unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["SLOW", "slow-returned", "OTHER"]);
    }

    #[test]
    fn test_reentrant_dispatch_on_same_thread() {
        // Redispatch runs ctx.dispatch while the outer dispatch holds the gate
        let store = Store::builder(TestState::default(), test_reducer)
            .with(Redispatch)
            .build();

        assert_eq!(store.dispatch(Action::new("PING")), Ok(Value::Bool(false)));
    }
}

//! Test utilities for promise-dispatch pipelines
//!
//! - [`TestHarness`]: a pipeline whose sink records every value reaching it
//! - Assertion macros for verifying dispatched actions by type
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch::testing::TestHarness;
//! use promise_dispatch::{assert_dispatched, Action, PromiseMiddleware};
//!
//! let harness = TestHarness::with_middleware(PromiseMiddleware::new());
//!
//! harness.dispatch(Action::new("PLAIN"))?;
//!
//! let recorded = harness.drain_recorded();
//! assert_dispatched!(recorded, "PLAIN");
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use crate::action::action_type;
use crate::store::{DispatchResult, Dispatcher, Middleware, Pipeline, PipelineBuilder};
use crate::value::Value;

type Recorded = Arc<Mutex<Vec<Value>>>;

/// Pipeline harness recording what reaches the end of the chain.
///
/// The sink returns the value it received, the way a plain store dispatch
/// returns its action.
#[derive(Debug)]
pub struct TestHarness {
    pipeline: Pipeline,
    recorded: Recorded,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// A harness with no middleware.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A harness with a single middleware in front of the sink.
    pub fn with_middleware<M: Middleware + 'static>(middleware: M) -> Self {
        Self::builder().with(middleware).build()
    }

    /// Start a harness with several middleware.
    pub fn builder() -> TestHarnessBuilder {
        let recorded: Recorded = Arc::default();
        let sink = Arc::clone(&recorded);
        let pipeline = Pipeline::builder(move |value: Value| {
            lock(&sink).push(value.clone());
            Ok(value)
        });
        TestHarnessBuilder { pipeline, recorded }
    }

    /// Dispatch from the start of the pipeline.
    pub fn dispatch(&self, action: impl Into<Value>) -> DispatchResult {
        self.pipeline.dispatch(action)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.pipeline.dispatcher()
    }

    /// Snapshot of everything recorded so far.
    pub fn recorded(&self) -> Vec<Value> {
        lock(&self.recorded).clone()
    }

    /// Take everything recorded so far.
    pub fn drain_recorded(&self) -> Vec<Value> {
        std::mem::take(&mut *lock(&self.recorded))
    }

    /// Types of the recorded values, in order. Untyped values show as `""`.
    pub fn recorded_types(&self) -> Vec<String> {
        lock(&self.recorded)
            .iter()
            .map(|value| action_type(value).unwrap_or_default().to_string())
            .collect()
    }

    pub fn recorded_count(&self) -> usize {
        lock(&self.recorded).len()
    }
}

/// Builder for [`TestHarness`].
#[derive(Debug)]
pub struct TestHarnessBuilder {
    pipeline: PipelineBuilder,
    recorded: Recorded,
}

impl TestHarnessBuilder {
    /// Append a middleware. Earlier middleware run first.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.pipeline = self.pipeline.with(middleware);
        self
    }

    pub fn build(self) -> TestHarness {
        TestHarness {
            pipeline: self.pipeline.build(),
            recorded: self.recorded,
        }
    }
}

fn lock(recorded: &Recorded) -> std::sync::MutexGuard<'_, Vec<Value>> {
    // A panicking test thread must not hide what was recorded
    recorded.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Assert that an action of the given type was dispatched.
///
/// # Example
///
/// ```ignore
/// let recorded = harness.drain_recorded();
/// assert_dispatched!(recorded, "FETCH");
/// ```
#[macro_export]
macro_rules! assert_dispatched {
    ($values:expr, $kind:expr) => {
        assert!(
            $values
                .iter()
                .any(|v| $crate::action::action_type(v) == Some($kind)),
            "Expected action `{}` to be dispatched, but got: {:?}",
            $kind,
            $values
        );
    };
}

/// Assert that NO action of the given type was dispatched.
///
/// # Example
///
/// ```ignore
/// let recorded = harness.drain_recorded();
/// assert_not_dispatched!(recorded, "FETCH_REJECTED");
/// ```
#[macro_export]
macro_rules! assert_not_dispatched {
    ($values:expr, $kind:expr) => {
        assert!(
            !$values
                .iter()
                .any(|v| $crate::action::action_type(v) == Some($kind)),
            "Expected action `{}` NOT to be dispatched, but it was: {:?}",
            $kind,
            $values
        );
    };
}

/// Find the first dispatched action of the given type.
#[macro_export]
macro_rules! find_dispatched {
    ($values:expr, $kind:expr) => {
        $values
            .iter()
            .find(|v| $crate::action::action_type(v) == Some($kind))
    };
}

/// Count how many dispatched actions have the given type.
///
/// # Example
///
/// ```ignore
/// assert_eq!(count_dispatched!(recorded, "FETCH"), 2);
/// ```
#[macro_export]
macro_rules! count_dispatched {
    ($values:expr, $kind:expr) => {
        $values
            .iter()
            .filter(|v| $crate::action::action_type(v) == Some($kind))
            .count()
    };
}

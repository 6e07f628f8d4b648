//! Promise-carrying actions
//!
//! [`PromiseMiddleware`] recognizes actions whose payload holds a thenable
//! under `promise`:
//!
//! ```text
//! { type: "FETCH", payload: { promise: <thenable>, page: 2 } }
//! ```
//!
//! and turns that one dispatch into a sequence of plain actions:
//!
//! 1. `{ type: "FETCH", payload: { page: 2 } }`, dispatched immediately
//! 2. once the thenable settles, either
//!    `{ type: "FETCH_RESOLVED", payload: <value>, meta: { payload: { page: 2 } } }` or
//!    `{ type: "FETCH_REJECTED", payload: <error>, meta: { payload: { page: 2 } } }`
//!
//! Both derived actions go through [`DispatchContext::dispatch`], so they
//! traverse the whole pipeline, including middleware placed before this one.
//! The dispatch call itself returns a thenable settling with the original
//! outcome, after the settlement action has been dispatched.
//!
//! Settlements are scheduled on the ambient tokio runtime. Dispatching a
//! promise action with no runtime current fails with
//! [`DispatchError::NoRuntime`] and dispatches nothing.
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch_core::{Action, Promise, PromiseMiddleware, Record, Store};
//!
//! let store = Store::builder(AppState::default(), reducer)
//!     .with(PromiseMiddleware::new())
//!     .build();
//!
//! let request = Promise::spawn(async { fetch_user(1).await });
//! let handle = store.dispatch(
//!     Action::new("FETCH_USER").with_payload(Record::new().with("promise", request).with("id", 1)),
//! )?;
//!
//! // FETCH_USER was reduced already; FETCH_USER_RESOLVED follows
//! let user = handle.settled().expect("thenable").await;
//! ```

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::action::{action_type, is_standard_action, Action};
use crate::error::DispatchError;
use crate::naming::Suffixes;
use crate::promise::{OnFulfilled, OnRejected, Thenable};
use crate::store::{DispatchContext, DispatchResult, Dispatcher, Middleware, Next};
use crate::value::{Record, Value};

/// Payload field holding the thenable
pub const PROMISE_FIELD: &str = "promise";

/// Middleware dispatching pending and settlement actions for
/// promise-carrying actions.
///
/// Suffixes are fixed at construction.
#[derive(Debug, Clone)]
pub struct PromiseMiddleware {
    suffixes: Suffixes,
    predicate: fn(&Value) -> bool,
}

impl Default for PromiseMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view of a qualifying action.
struct PromiseParts<'a> {
    kind: &'a str,
    payload: &'a Record,
    promise: &'a Arc<dyn Thenable>,
    meta: Option<&'a Value>,
}

impl PromiseMiddleware {
    /// Middleware with the default `_RESOLVED` / `_REJECTED` suffixes
    pub fn new() -> Self {
        Self::from_config(Suffixes::default())
    }

    pub fn with_suffixes(resolved: impl Into<String>, rejected: impl Into<String>) -> Self {
        Self::from_config(Suffixes::new(resolved, rejected))
    }

    pub fn from_config(suffixes: Suffixes) -> Self {
        Self {
            suffixes,
            predicate: is_standard_action,
        }
    }

    /// Replace the standard-action check run before anything else.
    pub fn with_predicate(mut self, predicate: fn(&Value) -> bool) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn suffixes(&self) -> &Suffixes {
        &self.suffixes
    }

    /// `name` + this middleware's resolved suffix
    pub fn resolve(&self, name: &str) -> String {
        self.suffixes.resolve(name)
    }

    /// `name` + this middleware's rejected suffix
    pub fn reject(&self, name: &str) -> String {
        self.suffixes.reject(name)
    }

    pub fn unresolve(&self, name: &str) -> String {
        self.suffixes.unresolve(name)
    }

    pub fn unreject(&self, name: &str) -> String {
        self.suffixes.unreject(name)
    }

    /// Whether `action` is a standard action whose payload carries a
    /// thenable under `promise`.
    pub fn qualifies(&self, action: &Value) -> bool {
        self.promise_parts(action).is_some()
    }

    fn promise_parts<'a>(&self, action: &'a Value) -> Option<PromiseParts<'a>> {
        if !(self.predicate)(action) {
            return None;
        }
        let kind = action_type(action)?;
        let payload = action.get("payload")?.as_record()?;
        let promise = payload.get(PROMISE_FIELD)?.as_thenable()?;
        Some(PromiseParts {
            kind,
            payload,
            promise,
            meta: action.get("meta"),
        })
    }
}

impl Middleware for PromiseMiddleware {
    fn handle(&self, ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
        let parts = match self.promise_parts(&action) {
            Some(parts) => parts,
            None => return next.run(action),
        };

        let kind = parts.kind.to_string();
        // Settlements are scheduled on tokio; refuse before anything is dispatched
        if Handle::try_current().is_err() {
            return Err(DispatchError::NoRuntime(kind));
        }
        let rest = parts.payload.without_key(PROMISE_FIELD);
        let promise = Arc::clone(parts.promise);
        let meta = settlement_meta(rest.clone(), parts.meta.cloned());

        let mut pending = Action::new(kind.as_str());
        if !rest.is_empty() {
            pending.payload = Some(Value::Record(rest));
        }
        tracing::debug!(action = %kind, "Dispatching pending promise action");
        ctx.dispatch(pending)?;

        let on_fulfilled: OnFulfilled = {
            let dispatcher = ctx.dispatcher();
            let kind = self.suffixes.resolve(&kind);
            let meta = meta.clone();
            Box::new(move |value: Value| {
                dispatch_settlement(&dispatcher, kind, value.clone(), meta);
                Ok(value)
            })
        };
        let on_rejected: OnRejected = {
            let dispatcher = ctx.dispatcher();
            let kind = self.suffixes.reject(&kind);
            Box::new(move |error: Value| {
                dispatch_settlement(&dispatcher, kind, error.clone(), meta);
                Err(error)
            })
        };

        Ok(Value::from(promise.then(on_fulfilled, on_rejected)))
    }
}

/// Meta for the settlement action: the extra payload fields under
/// `payload`, overlaid with the original meta record.
///
/// A non-record original meta cannot be merged and is kept as is.
fn settlement_meta(rest: Record, original: Option<Value>) -> Option<Value> {
    let mut meta = Record::new();
    if !rest.is_empty() {
        meta.insert("payload", rest);
    }

    match original {
        None | Some(Value::Null) => {}
        Some(Value::Record(original)) => meta.merge(original),
        Some(other) => return Some(other),
    }

    if meta.is_empty() {
        None
    } else {
        Some(Value::Record(meta))
    }
}

fn dispatch_settlement(dispatcher: &Dispatcher, kind: String, payload: Value, meta: Option<Value>) {
    let mut action = Action::new(kind).with_payload(payload);
    action.meta = meta;
    tracing::debug!(action = %action.kind, "Dispatching promise settlement");

    let kind = action.kind.clone();
    if let Err(err) = dispatcher.dispatch(action) {
        // Nothing upstream to return this to; the promise outcome still propagates
        tracing::warn!(action = %kind, error = %err, "Promise settlement dispatch failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::Promise;
    use crate::testing::TestHarness;
    use serde_json::json;

    fn promise_action(kind: &str, payload: Record) -> Action {
        Action::new(kind).with_payload(payload)
    }

    #[test]
    fn test_settlement_meta_rules() {
        assert_eq!(settlement_meta(Record::new(), None), None);
        assert_eq!(
            settlement_meta(Record::new(), Some(Value::from(Record::new()))),
            None
        );
        assert_eq!(
            settlement_meta(Record::new().with("page", 2), None),
            Some(json!({ "payload": { "page": 2 } }).into())
        );
        assert_eq!(
            settlement_meta(
                Record::new().with("page", 2),
                Some(json!({ "source": "ui" }).into())
            ),
            Some(json!({ "payload": { "page": 2 }, "source": "ui" }).into())
        );
        // Original meta wins on collision
        assert_eq!(
            settlement_meta(
                Record::new().with("page", 2),
                Some(json!({ "payload": "mine" }).into())
            ),
            Some(json!({ "payload": "mine" }).into())
        );
        assert_eq!(
            settlement_meta(Record::new().with("page", 2), Some(Value::from("tag"))),
            Some(Value::from("tag"))
        );
    }

    #[test]
    fn test_qualification() {
        let middleware = PromiseMiddleware::new();

        let qualifying = Value::from(promise_action(
            "A",
            Record::new().with(PROMISE_FIELD, Promise::never()),
        ));
        assert!(middleware.qualifies(&qualifying));

        assert!(!middleware.qualifies(&json!({ "type": "A" }).into()));
        assert!(!middleware.qualifies(&json!({ "type": "A", "payload": { "promise": 1 } }).into()));
        assert!(!middleware.qualifies(&json!({ "foo": "bar" }).into()));
        // Thenable payload that is not a record
        assert!(!middleware.qualifies(&Action::new("A").with_payload(Promise::never()).into()));

        // A non-bool `error` does not disqualify
        let mut flagged = qualifying.as_record().unwrap().clone();
        flagged.insert("error", "x");
        assert!(middleware.qualifies(&Value::Record(flagged)));

        // Not a standard action: extra top-level field
        let mut record = qualifying.as_record().unwrap().clone();
        record.insert("extra", 1);
        assert!(!middleware.qualifies(&Value::Record(record)));
    }

    #[test]
    fn test_custom_predicate() {
        fn only_fetch(value: &Value) -> bool {
            action_type(value) == Some("FETCH")
        }
        let middleware = PromiseMiddleware::new().with_predicate(only_fetch);
        let payload = Record::new().with(PROMISE_FIELD, Promise::never());

        assert!(middleware.qualifies(&promise_action("FETCH", payload.clone()).into()));
        assert!(!middleware.qualifies(&promise_action("OTHER", payload).into()));
    }

    #[test]
    fn test_instance_naming() {
        let middleware = PromiseMiddleware::with_suffixes("_OK", "_FAIL");
        assert_eq!(middleware.resolve("A"), "A_OK");
        assert_eq!(middleware.reject("A"), "A_FAIL");
        assert_eq!(middleware.unresolve("A_OK"), "A");
        assert_eq!(middleware.unreject("A_FAIL"), "A");
        assert_eq!(middleware.suffixes(), &Suffixes::new("_OK", "_FAIL"));
    }

    #[test]
    fn test_outside_runtime_dispatches_nothing() {
        let harness = TestHarness::with_middleware(PromiseMiddleware::new());

        let result = harness.dispatch(promise_action(
            "FETCH",
            Record::new().with(PROMISE_FIELD, Promise::resolved(1)),
        ));

        assert_eq!(result, Err(DispatchError::NoRuntime("FETCH".to_string())));
        assert_eq!(harness.recorded_count(), 0);

        // Plain actions still pass through
        assert!(harness.dispatch(Action::new("PLAIN")).is_ok());
        assert_eq!(harness.recorded_types(), vec!["PLAIN"]);
    }

    #[tokio::test]
    async fn test_pending_then_resolved() {
        let harness = TestHarness::with_middleware(PromiseMiddleware::new());
        let (promise, settler) = Promise::pending();

        let handle = harness
            .dispatch(promise_action(
                "FETCH",
                Record::new().with(PROMISE_FIELD, promise),
            ))
            .unwrap();

        assert_eq!(harness.recorded(), vec![Value::from(Action::new("FETCH"))]);

        settler.resolve(json!({ "id": 1 }));
        let outcome = handle.settled().unwrap().await;
        assert_eq!(outcome, Ok(json!({ "id": 1 }).into()));

        assert_eq!(
            harness.recorded(),
            vec![
                Value::from(Action::new("FETCH")),
                Value::from(Action::new("FETCH_RESOLVED").with_payload(json!({ "id": 1 }))),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejection_carries_meta_and_propagates() {
        let harness = TestHarness::with_middleware(PromiseMiddleware::new());

        let handle = harness
            .dispatch(promise_action(
                "FETCH",
                Record::new()
                    .with(PROMISE_FIELD, Promise::rejected("boom"))
                    .with("page", 2),
            ))
            .unwrap();

        let outcome = handle.settled().unwrap().await;
        assert_eq!(outcome, Err(Value::from("boom")));

        assert_eq!(
            harness.recorded(),
            vec![
                Value::from(Action::new("FETCH").with_payload(json!({ "page": 2 }))),
                Value::from(
                    Action::new("FETCH_REJECTED")
                        .with_payload("boom")
                        .with_meta(json!({ "payload": { "page": 2 } }))
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_pass_through_returns_next_result() {
        let harness = TestHarness::with_middleware(PromiseMiddleware::new());
        let action = Value::from(json!({ "type": "PLAIN", "payload": { "foo": "bar" } }));

        let result = harness.dispatch(action.clone()).unwrap();

        assert_eq!(result, action);
        assert_eq!(harness.recorded(), vec![action]);
    }
}

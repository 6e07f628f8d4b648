//! Promise-like handles for in-flight asynchronous operations
//!
//! Anything implementing [`Thenable`] can ride inside an action payload and be
//! picked up by [`PromiseMiddleware`](crate::PromiseMiddleware). [`Promise`]
//! is the implementation shipped with this crate: a cloneable shared future
//! whose continuations are scheduled on the ambient tokio runtime.
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch_core::{Promise, Thenable};
//!
//! let (promise, settler) = Promise::pending();
//!
//! let doubled = promise.then(
//!     Box::new(|v| Ok(v)),
//!     Box::new(|e| Err(e)),
//! );
//!
//! settler.resolve(21);
//! assert_eq!(doubled.await, Ok(21.into()));
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::value::Value;

/// Outcome of an asynchronous operation: `Ok(value)` or `Err(error)`.
pub type Settlement = Result<Value, Value>;

/// Continuation run with the value of a fulfilled operation.
pub type OnFulfilled = Box<dyn FnOnce(Value) -> Settlement + Send>;

/// Continuation run with the error of a rejected operation.
pub type OnRejected = Box<dyn FnOnce(Value) -> Settlement + Send>;

/// Capability of a promise-like handle: registering success and failure
/// continuations.
///
/// Exactly one of the two continuations runs, once, after the operation
/// settles. The returned promise settles with whatever that continuation
/// returns. Implementations must not run a continuation inside `then`
/// itself.
pub trait Thenable: fmt::Debug + Send + Sync {
    /// Register continuations, returning a promise for their result.
    fn then(&self, on_fulfilled: OnFulfilled, on_rejected: OnRejected) -> Promise;

    /// A promise settling with this handle's own outcome.
    fn settled(&self) -> Promise {
        self.then(Box::new(Ok::<Value, Value>), Box::new(Err::<Value, Value>))
    }
}

/// A cloneable handle to an asynchronous operation producing a [`Settlement`].
///
/// All clones observe the same outcome. A promise is also a future, so it can
/// be awaited directly.
#[derive(Clone)]
pub struct Promise {
    inner: Shared<BoxFuture<'static, Settlement>>,
}

impl Promise {
    /// Wrap a future. The future runs when the promise is first polled.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Spawn a future onto the current tokio runtime, so it makes progress
    /// whether or not anyone awaits the promise.
    ///
    /// A panic inside the future rejects the promise with a string error.
    /// Outside a runtime this falls back to [`Promise::new`]: the future only
    /// runs once the promise is polled.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => return Self::new(future),
        };
        let handle = runtime.spawn(future);
        Self::new(async move {
            handle
                .await
                .unwrap_or_else(|err| Err(Value::from(format!("promise task failed: {err}"))))
        })
    }

    /// A promise already fulfilled with `value`.
    pub fn resolved(value: impl Into<Value>) -> Self {
        Self::new(future::ready(Ok(value.into())))
    }

    /// A promise already rejected with `error`.
    pub fn rejected(error: impl Into<Value>) -> Self {
        Self::new(future::ready(Err(error.into())))
    }

    /// A promise settled later through the returned [`Settler`].
    ///
    /// Dropping the settler without settling leaves the promise pending
    /// forever.
    pub fn pending() -> (Self, Settler) {
        let (tx, rx) = oneshot::channel();
        let promise = Self::new(async move {
            match rx.await {
                Ok(settlement) => settlement,
                Err(_) => future::pending().await,
            }
        });
        (promise, Settler { tx })
    }

    /// A promise that never settles.
    pub fn never() -> Self {
        Self::new(future::pending())
    }

    /// The outcome, if the promise has already been driven to completion.
    pub fn peek(&self) -> Option<&Settlement> {
        self.inner.peek()
    }

    /// Whether two promises are clones of the same handle.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl Future for Promise {
    type Output = Settlement;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl Thenable for Promise {
    fn then(&self, on_fulfilled: OnFulfilled, on_rejected: OnRejected) -> Promise {
        let source = self.clone();
        Promise::spawn(async move {
            match source.await {
                Ok(value) => on_fulfilled(value),
                Err(error) => on_rejected(error),
            }
        })
    }

    fn settled(&self) -> Promise {
        self.clone()
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            None => f.write_str("Promise(<pending>)"),
            Some(Ok(value)) => f.debug_tuple("Promise::Resolved").field(value).finish(),
            Some(Err(error)) => f.debug_tuple("Promise::Rejected").field(error).finish(),
        }
    }
}

impl From<Promise> for Value {
    fn from(promise: Promise) -> Self {
        Value::Thenable(Arc::new(promise))
    }
}

/// Settles the promise created alongside it by [`Promise::pending`].
#[derive(Debug)]
pub struct Settler {
    tx: oneshot::Sender<Settlement>,
}

impl Settler {
    /// Settle with an explicit outcome.
    pub fn settle(self, settlement: Settlement) {
        // Nobody holding the promise any more is not an error
        let _ = self.tx.send(settlement);
    }

    /// Fulfill with `value`.
    pub fn resolve(self, value: impl Into<Value>) {
        self.settle(Ok(value.into()));
    }

    /// Reject with `error`.
    pub fn reject(self, error: impl Into<Value>) {
        self.settle(Err(error.into()));
    }
}

//! Fetch demo - promise-dispatch example
//!
//! Dispatches one `FETCH` action whose payload carries a simulated request.
//! The store sees the pending `FETCH` right away and `FETCH_RESOLVED` or
//! `FETCH_REJECTED` once the request settles.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p fetch-demo
//!
//! # Simulate a failure after 500ms, with debug logging
//! RUST_LOG=debug cargo run -p fetch-demo -- --fail --delay-ms 500
//!
//! # Custom settlement suffixes
//! cargo run -p fetch-demo -- --resolved-suffix _OK --rejected-suffix _ERR
//! ```

use std::time::Duration;

use clap::Parser;
use promise_dispatch::debug::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
use promise_dispatch::{
    Action, DispatchContext, DispatchResult, LoggingMiddleware, Middleware, Next, Promise,
    PromiseMiddleware, Record, Settlement, Store, Suffixes, Value, PROMISE_FIELD,
};

/// Simulated fetch demonstrating promise-dispatch
#[derive(Parser, Debug)]
#[command(name = "fetch-demo")]
#[command(about = "Dispatch a promise-carrying action and watch it settle")]
struct Args {
    /// Reject the request instead of resolving it
    #[arg(long)]
    fail: bool,

    /// Simulated request latency in milliseconds
    #[arg(long, default_value = "200")]
    delay_ms: u64,

    /// Suffix for fulfilled settlements
    #[arg(long, default_value = promise_dispatch::RESOLVED_SUFFIX)]
    resolved_suffix: String,

    /// Suffix for rejected settlements
    #[arg(long, default_value = promise_dispatch::REJECTED_SUFFIX)]
    rejected_suffix: String,

    /// Page number sent along with the request
    #[arg(long)]
    page: Option<u64>,

    /// Comma-separated glob patterns of actions to record (e.g. "FETCH*")
    #[arg(long)]
    actions: Option<String>,

    /// Tracing filter directives (defaults to RUST_LOG, then "info")
    #[arg(long)]
    log_filter: Option<String>,
}

#[derive(Debug, Default)]
struct FetchState {
    /// Settlement names depend on the configured suffixes
    suffixes: Suffixes,
    loading: bool,
    items: Option<Value>,
    error: Option<Value>,
}

fn reducer(state: &mut FetchState, action: &Action) -> bool {
    let kind = action.name();
    if kind == "FETCH" {
        state.loading = true;
        state.error = None;
        true
    } else if kind == state.suffixes.resolve("FETCH") {
        state.loading = false;
        state.items = action.payload.clone();
        true
    } else if kind == state.suffixes.reject("FETCH") {
        state.loading = false;
        state.error = action.payload.clone();
        true
    } else {
        false
    }
}

/// Prints every action reaching the store as JSON.
struct PrintMiddleware;

impl Middleware for PrintMiddleware {
    fn handle(&self, _ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
        match action.to_json() {
            Ok(json) => println!("-> {json}"),
            Err(err) => println!("-> {action:?} ({err})"),
        }
        next.run(action)
    }
}

fn simulated_request(delay: Duration, fail: bool, page: Option<u64>) -> Promise {
    Promise::spawn(async move {
        tokio::time::sleep(delay).await;
        if fail {
            Err(Value::from("request failed"))
        } else {
            let page = page.unwrap_or(1);
            Ok::<Value, Value>(
                Record::new()
                    .with("page", page)
                    .with("items", vec![Value::from("alpha"), Value::from("beta")])
                    .into(),
            )
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = match &args.log_filter {
        Some(directives) => tracing_subscriber::EnvFilter::try_new(directives)?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let suffixes = Suffixes::new(args.resolved_suffix, args.rejected_suffix);
    let action_logger = ActionLoggerMiddleware::with_log(ActionLogConfig::new(
        32,
        ActionLoggerConfig::new(args.actions.as_deref(), None),
    ));

    let state = FetchState {
        suffixes: suffixes.clone(),
        ..FetchState::default()
    };
    let store = Store::builder(state, reducer)
        .with(LoggingMiddleware::verbose())
        .with(PromiseMiddleware::from_config(suffixes))
        .with(action_logger.clone())
        .with(PrintMiddleware)
        .build();

    let mut payload = Record::new().with(
        PROMISE_FIELD,
        simulated_request(Duration::from_millis(args.delay_ms), args.fail, args.page),
    );
    if let Some(page) = args.page {
        payload.insert("page", page);
    }

    tracing::info!(fail = args.fail, delay_ms = args.delay_ms, "Dispatching FETCH");
    let handle = store.dispatch(Action::new("FETCH").with_payload(payload))?;

    let outcome: Option<Settlement> = match handle.settled() {
        Some(promise) => Some(promise.await),
        None => None,
    };
    match &outcome {
        Some(Ok(value)) => tracing::info!(?value, "Request resolved"),
        Some(Err(error)) => tracing::warn!(?error, "Request rejected"),
        None => tracing::warn!("Dispatch did not return a thenable"),
    }

    let (loading, items, error) =
        store.state(|s| (s.loading, s.items.clone(), s.error.clone()))?;
    println!("state: loading={loading} items={items:?} error={error:?}");

    if let Some(log) = action_logger.snapshot() {
        for entry in log.entries() {
            println!(
                "#{} {} changed={:?}",
                entry.sequence, entry.summary, entry.state_changed
            );
        }
    }
    Ok(())
}

//! Settlement action naming
//!
//! A settled promise action is named after the original action plus a suffix:
//! `FETCH` becomes `FETCH_RESOLVED` or `FETCH_REJECTED` by default. The free
//! functions here let reducers match those names without re-deriving them.
//!
//! # Example
//!
//! ```
//! use promise_dispatch_core::naming::{reject, resolve, unresolve, Suffixes};
//!
//! assert_eq!(resolve("FETCH"), "FETCH_RESOLVED");
//! assert_eq!(reject("FETCH"), "FETCH_REJECTED");
//! assert_eq!(unresolve("FETCH_RESOLVED"), "FETCH");
//!
//! let suffixes = Suffixes::new("_OK", "_FAIL");
//! assert_eq!(suffixes.resolve("FETCH"), "FETCH_OK");
//! ```

use serde::{Deserialize, Serialize};

/// Default suffix for fulfilled promise actions
pub const RESOLVED_SUFFIX: &str = "_RESOLVED";

/// Default suffix for rejected promise actions
pub const REJECTED_SUFFIX: &str = "_REJECTED";

/// `name` + [`RESOLVED_SUFFIX`]
pub fn resolve(name: &str) -> String {
    resolve_with(name, RESOLVED_SUFFIX)
}

/// `name` + [`REJECTED_SUFFIX`]
pub fn reject(name: &str) -> String {
    reject_with(name, REJECTED_SUFFIX)
}

/// `name` with the first [`RESOLVED_SUFFIX`] removed
pub fn unresolve(name: &str) -> String {
    unresolve_with(name, RESOLVED_SUFFIX)
}

/// `name` with the first [`REJECTED_SUFFIX`] removed
pub fn unreject(name: &str) -> String {
    unreject_with(name, REJECTED_SUFFIX)
}

pub fn resolve_with(name: &str, suffix: &str) -> String {
    format!("{name}{suffix}")
}

pub fn reject_with(name: &str, suffix: &str) -> String {
    format!("{name}{suffix}")
}

pub fn unresolve_with(name: &str, suffix: &str) -> String {
    remove_first(name, suffix)
}

pub fn unreject_with(name: &str, suffix: &str) -> String {
    remove_first(name, suffix)
}

// Removes the first occurrence wherever it appears, not only at the end
fn remove_first(name: &str, pattern: &str) -> String {
    name.replacen(pattern, "", 1)
}

/// The suffix pair a [`PromiseMiddleware`](crate::PromiseMiddleware) names
/// settlement actions with.
///
/// Missing fields fall back to the defaults when deserializing, so
/// `{"resolved": "_OK"}` keeps `_REJECTED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Suffixes {
    /// Appended to the action type when the promise fulfills
    pub resolved: String,
    /// Appended to the action type when the promise rejects
    pub rejected: String,
}

impl Default for Suffixes {
    fn default() -> Self {
        Self {
            resolved: RESOLVED_SUFFIX.to_string(),
            rejected: REJECTED_SUFFIX.to_string(),
        }
    }
}

impl Suffixes {
    pub fn new(resolved: impl Into<String>, rejected: impl Into<String>) -> Self {
        Self {
            resolved: resolved.into(),
            rejected: rejected.into(),
        }
    }

    /// Parse from JSON, e.g. `{"resolved": "_OK", "rejected": "_FAIL"}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn resolve(&self, name: &str) -> String {
        resolve_with(name, &self.resolved)
    }

    pub fn reject(&self, name: &str) -> String {
        reject_with(name, &self.rejected)
    }

    pub fn unresolve(&self, name: &str) -> String {
        unresolve_with(name, &self.resolved)
    }

    pub fn unreject(&self, name: &str) -> String {
        unreject_with(name, &self.rejected)
    }
}

//! Standard actions

use crate::error::ActionShapeError;
use crate::value::{Record, Value};

/// Fields a standard action may carry.
pub const ACTION_FIELDS: [&str; 4] = ["type", "payload", "meta", "error"];

/// A standard action: `{ type, payload?, meta?, error? }`.
///
/// Pipelines move actions around as [`Value`] records; `Action` is the typed
/// view used to build and inspect them.
///
/// # Example
///
/// ```
/// use promise_dispatch_core::{Action, Value};
/// use serde_json::json;
///
/// let action = Action::new("FETCH").with_payload(json!({ "page": 2 }));
/// let value = Value::from(action.clone());
///
/// assert_eq!(value.get("type"), Some(&Value::from("FETCH")));
/// assert_eq!(Action::try_from(value).unwrap(), action);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Action {
    /// The action's `type` field
    pub kind: String,
    pub payload: Option<Value>,
    pub meta: Option<Value>,
    pub error: Option<bool>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_meta(mut self, meta: impl Into<Value>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    pub fn with_error(mut self, error: bool) -> Self {
        self.error = Some(error);
        self
    }

    /// Action type, for logging and filtering
    pub fn name(&self) -> &str {
        &self.kind
    }

    /// One-line description for logs: the type plus the payload's field names.
    pub fn summary(&self) -> String {
        match &self.payload {
            None => self.kind.clone(),
            Some(Value::Record(record)) => {
                let fields: Vec<&str> = record.keys().collect();
                format!("{} {{ {} }}", self.kind, fields.join(", "))
            }
            Some(other) => format!("{} ({})", self.kind, other.kind_name()),
        }
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        let mut record = Record::new().with("type", action.kind);
        if let Some(payload) = action.payload {
            record.insert("payload", payload);
        }
        if let Some(meta) = action.meta {
            record.insert("meta", meta);
        }
        if let Some(error) = action.error {
            record.insert("error", error);
        }
        Value::Record(record)
    }
}

impl TryFrom<Value> for Action {
    type Error = ActionShapeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let record = match value {
            Value::Record(record) => record,
            other => return Err(ActionShapeError::NotARecord(other.kind_name())),
        };

        let mut action = Action::default();
        let mut has_type = false;
        for (key, field) in record {
            match key.as_str() {
                "type" => match field {
                    Value::String(kind) => {
                        action.kind = kind;
                        has_type = true;
                    }
                    other => return Err(ActionShapeError::NonStringType(other.kind_name())),
                },
                "payload" => action.payload = Some(field),
                "meta" => action.meta = Some(field),
                "error" => match field {
                    Value::Bool(error) => action.error = Some(error),
                    other => return Err(ActionShapeError::NonBoolError(other.kind_name())),
                },
                _ => return Err(ActionShapeError::UnknownField(key)),
            }
        }

        if !has_type {
            return Err(ActionShapeError::MissingType);
        }
        Ok(action)
    }
}

/// The `type` of an action-like record, if it has a string one.
pub fn action_type(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}

/// Check a value against the standard action shape.
///
/// Accepts records with a string `type` and no fields besides `type`,
/// `payload`, `meta` and `error`. The field values are not inspected, so
/// a non-bool `error` still passes here; [`Action::try_from`] is stricter.
pub fn is_standard_action(value: &Value) -> bool {
    check_standard_action(value).is_ok()
}

/// Like [`is_standard_action`], reporting why a value was rejected.
pub fn check_standard_action(value: &Value) -> Result<(), ActionShapeError> {
    let record = value
        .as_record()
        .ok_or_else(|| ActionShapeError::NotARecord(value.kind_name()))?;

    match record.get("type") {
        None => return Err(ActionShapeError::MissingType),
        Some(Value::String(_)) => {}
        Some(other) => return Err(ActionShapeError::NonStringType(other.kind_name())),
    }

    match record.keys().find(|key| !ACTION_FIELDS.contains(key)) {
        Some(key) => Err(ActionShapeError::UnknownField(key.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_action_accepts() {
        assert!(is_standard_action(&json!({ "type": "A" }).into()));
        assert!(is_standard_action(
            &json!({ "type": "A", "payload": 1, "meta": "m", "error": false }).into()
        ));
        // Any string is a valid type
        assert!(is_standard_action(&json!({ "type": "" }).into()));
        // Field values are not inspected
        assert!(is_standard_action(&json!({ "type": "A", "error": "yes" }).into()));
    }

    #[test]
    fn test_standard_action_rejects() {
        assert!(!is_standard_action(&Value::Null));
        assert!(!is_standard_action(&json!(["type", "A"]).into()));
        assert!(!is_standard_action(&json!({ "foo": "bar" }).into()));
        assert!(!is_standard_action(&json!({ "type": 3 }).into()));
        assert!(!is_standard_action(
            &json!({ "type": "A", "extra": 1 }).into()
        ));
    }

    #[test]
    fn test_check_reports_reason() {
        assert_eq!(
            check_standard_action(&json!({ "type": "A", "extra": 1 }).into()),
            Err(ActionShapeError::UnknownField("extra".into()))
        );
        assert_eq!(
            check_standard_action(&Value::from("A")),
            Err(ActionShapeError::NotARecord("string"))
        );
    }

    #[test]
    fn test_value_conversion_omits_absent_fields() {
        let value = Value::from(Action::new("A"));
        let record = value.as_record().unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["type"]);

        let value = Value::from(Action::new("A").with_meta("m").with_error(true));
        assert_eq!(value.get("meta"), Some(&Value::from("m")));
        assert_eq!(value.get("error"), Some(&Value::from(true)));
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_try_from_value() {
        let action = Action::try_from(Value::from(json!({
            "type": "FETCH",
            "payload": { "page": 2 },
            "error": false
        })))
        .unwrap();
        assert_eq!(action.kind, "FETCH");
        assert_eq!(action.payload, Some(json!({ "page": 2 }).into()));
        assert_eq!(action.error, Some(false));
        assert!(action.meta.is_none());

        assert_eq!(
            Action::try_from(Value::from(json!({ "payload": 1 }))),
            Err(ActionShapeError::MissingType)
        );
        assert_eq!(
            Action::try_from(Value::from(json!({ "type": "A", "error": "yes" }))),
            Err(ActionShapeError::NonBoolError("string"))
        );
    }

    #[test]
    fn test_action_type() {
        assert_eq!(action_type(&json!({ "type": "A" }).into()), Some("A"));
        assert_eq!(action_type(&json!({ "type": 1 }).into()), None);
        assert_eq!(action_type(&Value::from("A")), None);
    }

    #[test]
    fn test_summary() {
        assert_eq!(Action::new("A").summary(), "A");
        assert_eq!(
            Action::new("A")
                .with_payload(json!({ "page": 2, "q": "x" }))
                .summary(),
            "A { page, q }"
        );
        assert_eq!(Action::new("A").with_payload(3).summary(), "A (number)");
    }
}

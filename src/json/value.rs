use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{AcmeError, AcmeResult};
use crate::wire::identifier::AcmeIdentifier;
use crate::wire::problem::AcmeProblem;

/// An immutable parsed JSON tree with typed, path-aware accessors.
///
/// Every accessor fails with [`AcmeError::Protocol`] naming the JSON path and
/// the expected type when the value is absent or ill-typed. `get` and
/// `optional` distinguish an absent key from one whose value is `null`.
#[derive(Debug, Clone)]
pub struct JsonValue {
    path: String,
    value: Value,
}

impl JsonValue {
    pub fn parse(bytes: &[u8]) -> AcmeResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Self::root(value))
    }

    pub fn root(value: Value) -> Self {
        Self {
            path: "$".to_string(),
            value,
        }
    }

    pub fn inner(&self) -> &Value {
        &self.value
    }

    pub fn into_inner(self) -> Value {
        self.value
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn type_error(&self, expected: &str) -> AcmeError {
        AcmeError::Protocol(format!(
            "expected {expected} at {}, got {}",
            self.path,
            type_name(&self.value)
        ))
    }

    pub fn as_str(&self) -> AcmeResult<&str> {
        self.value.as_str().ok_or_else(|| self.type_error("a string"))
    }

    pub fn as_i64(&self) -> AcmeResult<i64> {
        self.value.as_i64().ok_or_else(|| self.type_error("an integer"))
    }

    pub fn as_f64(&self) -> AcmeResult<f64> {
        self.value.as_f64().ok_or_else(|| self.type_error("a number"))
    }

    pub fn as_bool(&self) -> AcmeResult<bool> {
        self.value.as_bool().ok_or_else(|| self.type_error("a boolean"))
    }

    pub fn as_object(&self) -> AcmeResult<&Map<String, Value>> {
        self.value.as_object().ok_or_else(|| self.type_error("an object"))
    }

    pub fn as_array(&self) -> AcmeResult<Vec<JsonValue>> {
        let array = self.value.as_array().ok_or_else(|| self.type_error("an array"))?;
        Ok(array
            .iter()
            .enumerate()
            .map(|(i, v)| JsonValue {
                path: format!("{}[{}]", self.path, i),
                value: v.clone(),
            })
            .collect())
    }

    /// A required member. Fails naming the path if `key` is absent (including
    /// if this value isn't an object at all).
    pub fn get(&self, key: &str) -> AcmeResult<JsonValue> {
        self.optional(key)?
            .ok_or_else(|| AcmeError::Protocol(format!("missing required field {}.{key}", self.path)))
    }

    /// `None` if `key` is absent; `Some` (possibly wrapping `null`) if present.
    pub fn optional(&self, key: &str) -> AcmeResult<Option<JsonValue>> {
        let object = self.as_object()?;
        Ok(object.get(key).map(|v| JsonValue {
            path: format!("{}.{key}", self.path),
            value: v.clone(),
        }))
    }

    /// Parses an ISO-8601 / RFC 3339 timestamp.
    pub fn as_instant(&self) -> AcmeResult<DateTime<FixedOffset>> {
        let raw = self.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .map_err(|err| AcmeError::Protocol(format!("invalid timestamp at {}: {err}", self.path)))
    }

    /// Parses a duration expressed in seconds.
    pub fn as_duration(&self) -> AcmeResult<Duration> {
        let seconds = self.as_i64()?;
        if seconds < 0 {
            return Err(AcmeError::Protocol(format!(
                "negative duration at {}",
                self.path
            )));
        }
        Ok(Duration::from_secs(seconds as u64))
    }

    /// Validates and returns a URL string.
    pub fn as_url(&self) -> AcmeResult<&str> {
        let raw = self.as_str()?;
        if raw.starts_with("https://") || raw.starts_with("http://") {
            Ok(raw)
        } else {
            Err(AcmeError::Protocol(format!(
                "expected a URL at {}, got {raw:?}",
                self.path
            )))
        }
    }

    pub fn as_identifier(&self) -> AcmeResult<AcmeIdentifier> {
        let type_ = self.get("type")?.as_str()?.to_string();
        let value = self.get("value")?.as_str()?.to_string();
        Ok(AcmeIdentifier { type_, value })
    }

    /// Decodes this value into a typed struct via serde.
    pub fn into_typed<T: DeserializeOwned>(self) -> AcmeResult<T> {
        serde_json::from_value(self.value)
            .map_err(|err| AcmeError::Protocol(format!("decoding {}: {err}", self.path)))
    }

    /// Decodes an RFC 7807 problem document field by field, rather than via
    /// `into_typed`, so a malformed `subproblems` entry or wrong-typed
    /// `status` names its exact path instead of a generic serde message.
    pub fn as_problem(&self) -> AcmeResult<AcmeProblem> {
        let type_ = match self.optional("type")? {
            Some(value) => value.as_str()?.to_string(),
            None => "about:blank".to_string(),
        };
        let title = self
            .optional("title")?
            .filter(|v| !v.is_null())
            .map(|v| v.as_str().map(str::to_string))
            .transpose()?;
        let status = self
            .optional("status")?
            .filter(|v| !v.is_null())
            .map(|v| v.as_i64())
            .transpose()?
            .map(|n| n as u16);
        let detail = self
            .optional("detail")?
            .filter(|v| !v.is_null())
            .map(|v| v.as_str().map(str::to_string))
            .transpose()?;
        let identifier = self
            .optional("identifier")?
            .filter(|v| !v.is_null())
            .map(|v| v.as_identifier())
            .transpose()?;
        let subproblems = match self.optional("subproblems")? {
            Some(value) if !value.is_null() => value
                .as_array()?
                .iter()
                .map(JsonValue::as_problem)
                .collect::<AcmeResult<Vec<_>>>()?,
            _ => Vec::new(),
        };
        Ok(AcmeProblem {
            type_,
            title,
            status,
            detail,
            identifier,
            subproblems,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_accessors() {
        let v = JsonValue::root(json!({
            "name": "example.org",
            "count": 3,
            "ok": true,
            "when": "2015-03-01T14:09:07.99Z",
            "identifier": {"type": "dns", "value": "example.org"},
            "items": [1, 2, 3]
        }));

        assert_eq!(v.get("name").unwrap().as_str().unwrap(), "example.org");
        assert_eq!(v.get("count").unwrap().as_i64().unwrap(), 3);
        assert!(v.get("ok").unwrap().as_bool().unwrap());
        v.get("when").unwrap().as_instant().unwrap();
        assert_eq!(
            v.get("identifier").unwrap().as_identifier().unwrap(),
            AcmeIdentifier::dns("example.org")
        );
        assert_eq!(v.get("items").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn missing_field_names_path() {
        let v = JsonValue::root(json!({"a": 1}));
        let err = v.get("b").unwrap_err();
        assert!(err.to_string().contains("$.b"));
    }

    #[test]
    fn optional_distinguishes_absent_from_null() {
        let v = JsonValue::root(json!({"a": null}));
        assert!(v.optional("a").unwrap().unwrap().is_null());
        assert!(v.optional("b").unwrap().is_none());
    }

    #[test]
    fn type_mismatch_names_expected_type() {
        let v = JsonValue::root(json!({"a": "not a number"}));
        let err = v.get("a").unwrap().as_i64().unwrap_err();
        assert!(err.to_string().contains("an integer"));
        assert!(err.to_string().contains("$.a"));
    }

    #[test]
    fn as_problem_decodes_subproblems_and_identifier() {
        let v = JsonValue::root(json!({
            "type": "urn:ietf:params:acme:error:malformed",
            "detail": "Some of the identifiers requested were rejected",
            "subproblems": [
                {
                    "type": "urn:ietf:params:acme:error:rejectedIdentifier",
                    "detail": "This CA will not issue for \"example.net\"",
                    "identifier": {"type": "dns", "value": "example.net"}
                }
            ]
        }));
        let problem = v.as_problem().unwrap();
        assert_eq!(problem.type_, "urn:ietf:params:acme:error:malformed");
        assert_eq!(problem.detail.as_deref(), Some("Some of the identifiers requested were rejected"));
        assert_eq!(problem.subproblems.len(), 1);
        assert_eq!(
            problem.subproblems[0].identifier,
            Some(AcmeIdentifier::dns("example.net"))
        );
    }

    #[test]
    fn as_problem_defaults_missing_type_to_about_blank() {
        let v = JsonValue::root(json!({"detail": "oops"}));
        let problem = v.as_problem().unwrap();
        assert_eq!(problem.type_, "about:blank");
    }
}

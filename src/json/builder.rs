use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::base64url;

/// An insertion-order-preserving key/value builder, serialized to compact
/// canonical JSON text. Used as the JWS payload for operations whose field
/// set is decided at runtime (an accumulating account update, the inner
/// payload of a key-change request) rather than fixed by a typed struct.
#[derive(Debug, Default, Clone)]
pub struct JsonBuilder {
    fields: Map<String, Value>,
}

impl JsonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Inserts `value`, serialized through serde. Overwrites any previous
    /// value for `key` in place, preserving the key's original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> &mut Self {
        let value = serde_json::to_value(value).expect("value must serialize");
        self.fields.insert(key.into(), value);
        self
    }

    /// Inserts `bytes` as an unpadded base64url string.
    pub fn set_base64url(&mut self, key: impl Into<String>, bytes: impl AsRef<[u8]>) -> &mut Self {
        self.set(key, base64url::encode(bytes))
    }

    /// Inserts `instant` as an ISO-8601 / RFC 3339 timestamp string.
    pub fn set_instant(&mut self, key: impl Into<String>, instant: DateTime<Utc>) -> &mut Self {
        self.set(key, instant.to_rfc3339())
    }

    /// Inserts a duration expressed in whole seconds.
    pub fn set_seconds(&mut self, key: impl Into<String>, duration: std::time::Duration) -> &mut Self {
        self.set(key, duration.as_secs())
    }

    /// Inserts `jwk_json` — a JWK already serialized to text, as produced by
    /// an `AccountKey`'s `public_jwk()` — as a nested JSON object rather than
    /// a doubly-encoded string.
    pub fn set_jwk(&mut self, key: impl Into<String>, jwk_json: impl AsRef<str>) -> &mut Self {
        let value: Value =
            serde_json::from_str(jwk_json.as_ref()).expect("a public JWK always serializes to valid JSON");
        self.fields.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.fields).expect("map of JSON values always serializes")
    }

    pub fn to_json_vec(&self) -> Vec<u8> {
        serde_json::to_vec(&self.fields).expect("map of JSON values always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut b = JsonBuilder::new();
        b.set("zebra", 1).set("apple", 2).set("mango", 3);
        assert_eq!(b.to_json_string(), r#"{"zebra":1,"apple":2,"mango":3}"#);
    }

    #[test]
    fn overwrite_keeps_original_position() {
        let mut b = JsonBuilder::new();
        b.set("a", 1).set("b", 2).set("a", 3);
        assert_eq!(b.to_json_string(), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn set_base64url_is_unpadded() {
        let mut b = JsonBuilder::new();
        b.set_base64url("csr", b"hi");
        assert_eq!(b.to_json_string(), r#"{"csr":"aGk"}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let mut b = JsonBuilder::new();
        b.set("nested", serde_json::json!({"a": 1}));
        assert!(!b.to_json_string().contains(' '));
    }
}

//! Provider adapters.
//!
//! Every adapter decodes in two phases: the body is parsed into a generic
//! JSON document, the required keys are checked for presence, and only then
//! are fields coerced into a strongly typed record. A present but
//! wrong-typed field is a [`DecodeError::TypeMismatch`], never a zero value.

pub mod price;
pub mod releases;
pub mod stakepool;
pub mod supply;
pub mod vsp;

use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Parses `body` into a generic JSON value.
pub fn parse_document(body: &[u8]) -> Result<Value, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}

/// Borrowed view over a JSON object with typed, validated accessors.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Wraps `value` if it is an object; `context` names it in the error.
    pub fn of(value: &'a Value, context: &str) -> Result<Self, DecodeError> {
        value
            .as_object()
            .map(|map| Fields { map })
            .ok_or_else(|| DecodeError::TypeMismatch {
                field: context.to_string(),
                expected: "an object",
            })
    }

    /// Fails with every absent key, in the order given.
    pub fn require(&self, keys: &[&str]) -> Result<(), DecodeError> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !self.map.contains_key(**key))
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::MissingFields { keys: missing })
        }
    }

    fn get(&self, key: &str) -> Result<&'a Value, DecodeError> {
        self.map.get(key).ok_or_else(|| DecodeError::MissingFields {
            keys: vec![key.to_string()],
        })
    }

    fn mismatch(key: &str, expected: &'static str) -> DecodeError {
        DecodeError::TypeMismatch {
            field: key.to_string(),
            expected,
        }
    }

    pub fn number(&self, key: &str) -> Result<f64, DecodeError> {
        self.get(key)?
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| Self::mismatch(key, "a number"))
    }

    /// A non-negative count; fractional parts are truncated.
    pub fn count(&self, key: &str) -> Result<u64, DecodeError> {
        let value = self.number(key)?;
        if value < 0.0 {
            return Err(Self::mismatch(key, "a non-negative number"));
        }
        Ok(value as u64)
    }

    pub fn string(&self, key: &str) -> Result<&'a str, DecodeError> {
        self.get(key)?
            .as_str()
            .ok_or_else(|| Self::mismatch(key, "a string"))
    }

    pub fn optional_string(&self, key: &str) -> Result<Option<&'a str>, DecodeError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| Self::mismatch(key, "a string")),
        }
    }

    pub fn boolean(&self, key: &str) -> Result<bool, DecodeError> {
        self.get(key)?
            .as_bool()
            .ok_or_else(|| Self::mismatch(key, "a boolean"))
    }

    pub fn array(&self, key: &str) -> Result<&'a Vec<Value>, DecodeError> {
        self.get(key)?
            .as_array()
            .ok_or_else(|| Self::mismatch(key, "an array"))
    }

    pub fn object(&self, key: &str) -> Result<Fields<'a>, DecodeError> {
        Fields::of(self.get(key)?, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_reports_all_missing_keys_in_order() {
        let doc = json!({"a": 1, "c": 3});
        let fields = Fields::of(&doc, "root").unwrap();
        assert_eq!(
            fields.require(&["a", "b", "c", "d"]),
            Err(DecodeError::MissingFields {
                keys: vec!["b".into(), "d".into()]
            })
        );
    }

    #[test]
    fn test_wrong_type_is_a_mismatch_not_zero() {
        let doc = json!({"Live": "12", "Missed": -1});
        let fields = Fields::of(&doc, "root").unwrap();
        assert!(matches!(
            fields.count("Live"),
            Err(DecodeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            fields.count("Missed"),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_count_truncates_float() {
        let doc = json!({"Live": 12.9});
        let fields = Fields::of(&doc, "root").unwrap();
        assert_eq!(fields.count("Live"), Ok(12));
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        let doc = parse_document(b"[1, 2, 3]").unwrap();
        assert!(Fields::of(&doc, "response").is_err());
        assert!(matches!(
            parse_document(b"not json"),
            Err(DecodeError::Json(_))
        ));
    }
}

//! Typed access to the `data` object of a request.
//!
//! Web forms submit identifiers as strings, so identifier accessors accept
//! either JSON integers or decimal strings. A `null` value counts as absent.

use serde_json::Value;
use thiserror::Error;

use prepper_protocol::Data;

/// A request field that is absent or has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum FieldError {
    #[error("Missing required field: {0}")]
    Missing(&'static str),
    #[error("Invalid field: {0}")]
    Invalid(&'static str),
}

/// Borrowed view over request arguments.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields<'a> {
    data: &'a Data,
}

impl<'a> Fields<'a> {
    pub(crate) const fn new(data: &'a Data) -> Self {
        Self { data }
    }

    fn value(&self, name: &str) -> Option<&'a Value> {
        self.data.get(name).filter(|value| !value.is_null())
    }

    /// Raw value of a field, `null` when absent.
    pub(crate) fn raw(&self, name: &str) -> Value {
        self.value(name).cloned().unwrap_or(Value::Null)
    }

    pub(crate) fn required_str(&self, name: &'static str) -> Result<&'a str, FieldError> {
        self.optional_str(name)?.ok_or(FieldError::Missing(name))
    }

    pub(crate) fn optional_str(&self, name: &'static str) -> Result<Option<&'a str>, FieldError> {
        match self.value(name) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(_) => Err(FieldError::Invalid(name)),
        }
    }

    /// Optional text where blank strings count as absent.
    pub(crate) fn optional_text(&self, name: &'static str) -> Result<Option<&'a str>, FieldError> {
        Ok(self
            .optional_str(name)?
            .map(str::trim)
            .filter(|text| !text.is_empty()))
    }

    pub(crate) fn required_id(&self, name: &'static str) -> Result<i64, FieldError> {
        self.optional_id(name)?.ok_or(FieldError::Missing(name))
    }

    pub(crate) fn optional_id(&self, name: &'static str) -> Result<Option<i64>, FieldError> {
        match self.value(name) {
            None => Ok(None),
            Some(Value::Number(number)) => number
                .as_i64()
                .map(Some)
                .ok_or(FieldError::Invalid(name)),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| FieldError::Invalid(name)),
            Some(_) => Err(FieldError::Invalid(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn data(value: Value) -> Data {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[rstest]
    #[case::integer(json!({"image_id": 9}), Ok(9))]
    #[case::string(json!({"image_id": " 9 "}), Ok(9))]
    #[case::missing(json!({}), Err(FieldError::Missing("image_id")))]
    #[case::null(json!({"image_id": null}), Err(FieldError::Missing("image_id")))]
    #[case::blank(json!({"image_id": ""}), Err(FieldError::Missing("image_id")))]
    #[case::float(json!({"image_id": 9.5}), Err(FieldError::Invalid("image_id")))]
    #[case::word(json!({"image_id": "nine"}), Err(FieldError::Invalid("image_id")))]
    #[case::array(json!({"image_id": [9]}), Err(FieldError::Invalid("image_id")))]
    fn identifiers_accept_numbers_and_numeric_strings(
        #[case] input: Value,
        #[case] expected: Result<i64, FieldError>,
    ) {
        let data = data(input);
        assert_eq!(Fields::new(&data).required_id("image_id"), expected);
    }

    #[test]
    fn strings_reject_other_types() {
        let data = data(json!({"username": 7}));
        let fields = Fields::new(&data);
        assert_eq!(
            fields.required_str("username"),
            Err(FieldError::Invalid("username"))
        );
        assert_eq!(
            fields.required_str("password"),
            Err(FieldError::Missing("password"))
        );
    }

    #[test]
    fn blank_text_counts_as_absent() {
        let data = data(json!({"caption": "   ", "category": " Tools "}));
        let fields = Fields::new(&data);
        assert_eq!(fields.optional_text("caption"), Ok(None));
        assert_eq!(fields.optional_text("category"), Ok(Some("Tools")));
    }

    #[test]
    fn error_messages_name_the_field() {
        assert_eq!(
            FieldError::Missing("image_id").to_string(),
            "Missing required field: image_id"
        );
        assert_eq!(
            FieldError::Invalid("user_id").to_string(),
            "Invalid field: user_id"
        );
    }
}

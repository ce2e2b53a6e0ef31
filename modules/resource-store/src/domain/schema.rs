//! Per-type JSON Schema compilation and payload validation.

use jsonschema::Validator;
use jsonschema::error::ValidationErrorKind;

use crate::domain::error::{FieldError, ResourceError};

/// Load-time problems with an app's resource definitions.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("invalid schema for resource type '{type_name}': {message}")]
    InvalidSchema { type_name: String, message: String },

    #[error("invalid expires duration '{raw}' for resource type '{type_name}': {message}")]
    InvalidExpires {
        type_name: String,
        raw: String,
        message: String,
    },

    #[error("role '{role}' inherits unknown role '{missing}'")]
    UnknownInheritedRole { role: String, missing: String },
}

/// A resource type's schema, compiled once at registry build.
#[derive(Debug)]
pub struct CompiledSchema {
    validator: Validator,
    binary_fields: Vec<String>,
}

impl CompiledSchema {
    pub fn compile(type_name: &str, schema: &serde_json::Value) -> Result<Self, DefinitionError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| DefinitionError::InvalidSchema {
                type_name: type_name.to_owned(),
                message: e.to_string(),
            })?;
        Ok(Self {
            validator,
            binary_fields: binary_fields_of(schema),
        })
    }

    /// Top-level string fields declared with `format: binary`; their values
    /// are asset pointers, not data.
    #[must_use]
    pub fn binary_fields(&self) -> &[String] {
        &self.binary_fields
    }

    /// Validate a payload, collecting every violation into the structured
    /// per-field report.
    pub fn validate(&self, payload: &serde_json::Value) -> Result<(), ResourceError> {
        let errors: Vec<FieldError> = self
            .validator
            .iter_errors(payload)
            .map(|err| {
                let argument = match err.kind() {
                    ValidationErrorKind::Required { property } => property
                        .as_str()
                        .map_or_else(|| property.to_string(), str::to_owned),
                    _ => field_of_pointer(&err.instance_path().to_string()),
                };
                FieldError::new(argument, err.to_string())
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ResourceError::schema_validation(errors))
        }
    }
}

/// Last segment of a JSON pointer (`"/foo"` → `"foo"`, `""` → `""`).
fn field_of_pointer(pointer: &str) -> String {
    pointer.rsplit('/').next().unwrap_or_default().to_owned()
}

fn binary_fields_of(schema: &serde_json::Value) -> Vec<String> {
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Vec::new();
    };
    properties
        .iter()
        .filter(|(_, prop)| {
            prop.get("type").and_then(|t| t.as_str()) == Some("string")
                && prop.get("format").and_then(|f| f.as_str()) == Some("binary")
        })
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["foo"],
            "properties": {
                "foo": { "type": "string" },
                "age": { "type": "integer" },
                "picture": { "type": "string", "format": "binary" }
            }
        })
    }

    #[test]
    fn missing_required_property_names_the_field() {
        let schema = CompiledSchema::compile("person", &person_schema()).unwrap();
        let err = schema.validate(&json!({})).unwrap_err();
        match err {
            ResourceError::SchemaValidation { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].argument, "foo");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wrong_type_names_the_offending_field() {
        let schema = CompiledSchema::compile("person", &person_schema()).unwrap();
        let err = schema
            .validate(&json!({ "foo": "bar", "age": "old" }))
            .unwrap_err();
        match err {
            ResourceError::SchemaValidation { errors } => {
                assert_eq!(errors[0].argument, "age");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn valid_payload_passes() {
        let schema = CompiledSchema::compile("person", &person_schema()).unwrap();
        schema
            .validate(&json!({ "foo": "bar", "age": 7 }))
            .unwrap();
    }

    #[test]
    fn binary_fields_are_detected() {
        let schema = CompiledSchema::compile("person", &person_schema()).unwrap();
        assert_eq!(schema.binary_fields(), &["picture".to_owned()]);

        let plain = CompiledSchema::compile("pet", &json!({ "type": "object" })).unwrap();
        assert!(plain.binary_fields().is_empty());
    }

    #[test]
    fn malformed_schema_is_a_definition_error() {
        let err = CompiledSchema::compile("person", &json!({ "type": 12 })).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidSchema { .. }));
    }
}

//! JSON-schema validation of field `properties` payloads.
//!
//! Each field data type declares the shape of its free-form properties
//! payload as a JSON schema. The schemas are compiled once when the
//! validator is built; data types without constraints (`boolean`, `json`)
//! accept any payload.

use std::collections::HashMap;

use appforge_storage::DataType;
use jsonschema::Validator;
use serde_json::{json, Value};

use crate::error::EntityError;

pub struct PropertiesValidator {
    validators: HashMap<DataType, Validator>,
}

impl PropertiesValidator {
    pub fn new() -> Result<Self, EntityError> {
        let mut validators = HashMap::new();
        for (data_type, schema) in schemas() {
            let validator = jsonschema::validator_for(&schema).map_err(|e| {
                EntityError::Schema(format!("failed to compile {data_type:?} schema: {e}"))
            })?;
            validators.insert(data_type, validator);
        }
        Ok(Self { validators })
    }

    /// Check a properties payload against the schema for its data type.
    ///
    /// Returns the first schema violation as `InvalidProperties`.
    pub fn validate(
        &self,
        field_name: &str,
        data_type: DataType,
        properties: &Value,
    ) -> Result<(), EntityError> {
        let Some(validator) = self.validators.get(&data_type) else {
            return Ok(());
        };
        if let Some(error) = validator.iter_errors(properties).next() {
            return Err(EntityError::InvalidProperties {
                field: field_name.to_string(),
                message: error.to_string(),
            });
        }
        Ok(())
    }
}

fn schemas() -> Vec<(DataType, Value)> {
    vec![
        (
            DataType::SingleLineText,
            json!({
                "type": "object",
                "properties": {
                    "maxLength": { "type": "integer", "minimum": 1 }
                },
                "additionalProperties": false
            }),
        ),
        (
            DataType::MultiLineText,
            json!({
                "type": "object",
                "properties": {
                    "maxLength": { "type": "integer", "minimum": 1 }
                },
                "additionalProperties": false
            }),
        ),
        (
            DataType::Email,
            json!({
                "type": "object",
                "additionalProperties": false
            }),
        ),
        (
            DataType::WholeNumber,
            json!({
                "type": "object",
                "properties": {
                    "minimumValue": { "type": "integer" },
                    "maximumValue": { "type": "integer" }
                },
                "additionalProperties": false
            }),
        ),
        (
            DataType::DecimalNumber,
            json!({
                "type": "object",
                "properties": {
                    "minimumValue": { "type": "number" },
                    "maximumValue": { "type": "number" },
                    "precision": { "type": "integer", "minimum": 0 }
                },
                "additionalProperties": false
            }),
        ),
        (
            DataType::DateTime,
            json!({
                "type": "object",
                "properties": {
                    "timeZone": { "type": "string" },
                    "dateOnly": { "type": "boolean" }
                },
                "additionalProperties": false
            }),
        ),
        (
            DataType::Lookup,
            json!({
                "type": "object",
                "properties": {
                    "relatedEntityId": { "type": "string" },
                    "allowMultipleSelection": { "type": "boolean" }
                },
                "required": ["relatedEntityId"],
                "additionalProperties": false
            }),
        ),
        (
            DataType::OptionSet,
            json!({
                "type": "object",
                "properties": {
                    "options": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "label": { "type": "string" },
                                "value": { "type": "string" }
                            },
                            "required": ["label", "value"]
                        }
                    }
                },
                "required": ["options"],
                "additionalProperties": false
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> PropertiesValidator {
        PropertiesValidator::new().unwrap()
    }

    #[test]
    fn single_line_text_accepts_max_length() {
        let v = validator();
        v.validate(
            "title",
            DataType::SingleLineText,
            &json!({ "maxLength": 42 }),
        )
        .unwrap();
    }

    #[test]
    fn single_line_text_rejects_non_integer_max_length() {
        let v = validator();
        let err = v
            .validate(
                "title",
                DataType::SingleLineText,
                &json!({ "maxLength": "long" }),
            )
            .unwrap_err();
        assert!(matches!(err, EntityError::InvalidProperties { field, .. } if field == "title"));
    }

    #[test]
    fn unconstrained_types_accept_anything() {
        let v = validator();
        v.validate("flag", DataType::Boolean, &json!({ "whatever": [1, 2] }))
            .unwrap();
        v.validate("blob", DataType::Json, &json!("even a string"))
            .unwrap();
    }

    #[test]
    fn lookup_requires_related_entity() {
        let v = validator();
        let err = v
            .validate("customer", DataType::Lookup, &json!({}))
            .unwrap_err();
        assert!(matches!(err, EntityError::InvalidProperties { .. }));
        v.validate(
            "customer",
            DataType::Lookup,
            &json!({ "relatedEntityId": "ent-1" }),
        )
        .unwrap();
    }

    #[test]
    fn option_set_requires_at_least_one_option() {
        let v = validator();
        let err = v
            .validate("status", DataType::OptionSet, &json!({ "options": [] }))
            .unwrap_err();
        assert!(matches!(err, EntityError::InvalidProperties { .. }));
    }
}

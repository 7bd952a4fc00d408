use serde_json::Value;

use super::error::SchemaError;
use super::schema::{Schema, SchemaKind};

/// Checks `value` against `schema`.
///
/// `path` is the location of `value` within the root document; on failure the
/// returned error carries the full path to the offending element.
pub fn validate_value(
    schema: &Schema,
    value: &Value,
    path: &mut Vec<String>,
) -> std::result::Result<(), SchemaError> {
    if value.is_null() && schema.nullable {
        return Ok(());
    }

    match &schema.kind {
        SchemaKind::Null => {
            if !value.is_null() {
                return Err(SchemaError::at(path, "expected null"));
            }
        }
        SchemaKind::Boolean => {
            if !value.is_boolean() {
                return Err(SchemaError::at(path, "expected boolean"));
            }
        }
        SchemaKind::Integer { minimum, maximum } => {
            let number = value
                .as_i64()
                .ok_or_else(|| SchemaError::at(path, "expected integer"))?;
            if let Some(min) = minimum {
                if number < *min {
                    return Err(SchemaError::at(path, format!("must be at least {min}")));
                }
            }
            if let Some(max) = maximum {
                if number > *max {
                    return Err(SchemaError::at(path, format!("must be at most {max}")));
                }
            }
        }
        SchemaKind::Number => {
            if !value.is_number() {
                return Err(SchemaError::at(path, "expected number"));
            }
        }
        SchemaKind::String => {
            if !value.is_string() {
                return Err(SchemaError::at(path, "expected string"));
            }
        }
        SchemaKind::Enum { values } => {
            let text = value
                .as_str()
                .ok_or_else(|| SchemaError::at(path, "expected string"))?;
            if !values.iter().any(|allowed| allowed == text) {
                return Err(SchemaError::at(
                    path,
                    format!("expected one of {}", values.join(", ")),
                ));
            }
        }
        SchemaKind::Array { items } => {
            let array = value
                .as_array()
                .ok_or_else(|| SchemaError::at(path, "expected array"))?;
            for (idx, element) in array.iter().enumerate() {
                path.push(idx.to_string());
                validate_value(items, element, path)?;
                path.pop();
            }
        }
        SchemaKind::Object {
            properties,
            required,
            additional,
        } => {
            let object = value
                .as_object()
                .ok_or_else(|| SchemaError::at(path, "expected object"))?;

            for key in required {
                if object.get(key).map_or(true, Value::is_null) {
                    let mut required_path = path.clone();
                    required_path.push(key.clone());
                    return Err(SchemaError::at(
                        &required_path,
                        format!("missing required property `{key}`"),
                    ));
                }
            }

            for (key, val) in object {
                if let Some(sub_schema) = properties.get(key) {
                    path.push(key.clone());
                    validate_value(sub_schema, val, path)?;
                    path.pop();
                } else if !additional {
                    let mut extra_path = path.clone();
                    extra_path.push(key.clone());
                    return Err(SchemaError::at(
                        &extra_path,
                        format!("unexpected property `{key}`"),
                    ));
                }
            }
        }
        SchemaKind::Any => {}
    }

    Ok(())
}
